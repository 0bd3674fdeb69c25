//! Core logging types: step entries, status, and the [`Log`] trait.

/// Event target for stage headers.
pub const STAGE_TARGET: &str = "tmpl::stage";
/// Event target for sub-step lines.
pub const SUBSTEP_TARGET: &str = "tmpl::substep";
/// Event target for dry-run actions.
pub const DRY_RUN_TARGET: &str = "tmpl::dry_run";
/// Event target for messages emitted by templates through `print()`.
pub const PRINT_TARGET: &str = "tmpl::print";

/// Pipeline step result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    /// Human-readable step name.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail (counts, skip reason).
    pub message: Option<String>,
}

/// Status of a completed pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step ran and applied its changes.
    Ok,
    /// The step was disabled or had nothing to do.
    Skipped,
    /// The step ran in dry-run mode; nothing was changed.
    DryRun,
}

/// Abstraction over logging backends.
///
/// The pipeline logs through this trait so tests can capture messages
/// without installing a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log a sub-step of the current stage.
    fn substep(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log an action that was skipped because of `--dry-run`.
    fn dry_run(&self, msg: &str);
    /// Record a step result for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}
