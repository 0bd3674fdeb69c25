//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use super::types::{
    DRY_RUN_TARGET, Log, STAGE_TARGET, SUBSTEP_TARGET, StepEntry, StepStatus,
};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger emitting [`tracing`] events.
///
/// Console and file rendering are configured once by
/// [`init_subscriber`](super::subscriber::init_subscriber); without a
/// subscriber every method is a no-op apart from step recording.
#[derive(Debug)]
pub struct Logger {
    steps: Mutex<Vec<StepEntry>>,
    log_file: Option<PathBuf>,
    started: Instant,
}

impl Logger {
    /// Create a new logger. `log_file` is only shown in the run summary.
    #[must_use]
    pub fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            log_file,
            started: Instant::now(),
        }
    }

    /// Return a clone of all recorded step entries.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        self.steps.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log a sub-step of the current stage.
    pub fn substep(&self, msg: &str) {
        tracing::info!(target: SUBSTEP_TARGET, "{msg}");
    }

    /// Log an informational message (log file, or console with `--verbose`).
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Log a multi-line block (such as a YAML dump) at debug level, framed
    /// by a title line.
    pub fn debug_block(&self, title: &str, body: &str) {
        self.debug(&format!("---------- {title} ----------"));
        for line in body.lines() {
            self.debug(line);
        }
        self.debug(&format!("---------- end {title} ----------"));
    }

    /// Record a step result for the summary.
    pub fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.steps.lock() {
            guard.push(StepEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Log the summary of all recorded steps.
    pub fn print_summary(&self) {
        let steps = self.step_entries();
        if steps.is_empty() {
            return;
        }

        self.stage("Summary");
        for step in &steps {
            let icon = match step.status {
                StepStatus::Ok => "\x1b[32m✓\x1b[0m",
                StepStatus::Skipped => "\x1b[2m○\x1b[0m",
                StepStatus::DryRun => "\x1b[33m~\x1b[0m",
            };
            let suffix = step
                .message
                .as_ref()
                .map_or_else(String::new, |m| format!(" ({m})"));
            self.substep(&format!("{icon} {}{suffix}", step.name));
        }

        self.info(&format!(
            "Process complete in {:.2}s.",
            self.started.elapsed().as_secs_f64()
        ));
        if let Some(path) = &self.log_file {
            self.substep(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Log for Logger {
    forward_log_methods!(stage, substep, info, debug, warn, error, dry_run);

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        self.record_step(name, status, message);
    }
}
