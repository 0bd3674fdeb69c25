//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::{FileLevel, FileMode, FileSettings, LogSettings, init_subscriber};
pub use types::{
    DRY_RUN_TARGET, Log, PRINT_TARGET, STAGE_TARGET, SUBSTEP_TARGET, StepEntry, StepStatus,
};
