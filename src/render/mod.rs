//! Template rendering: the engine, its built-in functions, extension
//! libraries, and staging of mapped files into the working directory.
mod engine;
mod functions;
mod library;
mod orchestrator;

pub use engine::{Engine, EngineSettings};
pub use library::LibraryExport;
pub use orchestrator::{StageSummary, stage_all};
