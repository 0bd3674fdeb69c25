//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{DRY_RUN_TARGET, PRINT_TARGET, STAGE_TARGET, SUBSTEP_TARGET};
use super::utils::{format_utc_datetime, format_utc_time, strip_ansi};

/// Minimum level written to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FileLevel {
    /// Informational messages and above.
    #[default]
    Info,
    /// Everything, including configuration and mapping dumps.
    Debug,
}

/// How an existing log file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FileMode {
    /// Keep previous runs and append.
    #[default]
    Append,
    /// Truncate at start-up.
    Overwrite,
}

/// Log file destination and filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettings {
    /// Log file path.
    pub path: PathBuf,
    /// Minimum level written.
    pub level: FileLevel,
    /// Append to or truncate an existing file.
    pub mode: FileMode,
}

/// Console and file logging options for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// Show informational and debug messages on the console.
    pub verbose: bool,
    /// Colourise console output.
    pub color: bool,
    /// Suppress everything but errors on the console.
    pub quiet: bool,
    /// Optional persistent log file.
    pub file: Option<FileSettings>,
}

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
pub(super) struct MessageExtractor {
    pub(super) message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// A [`tracing_subscriber::Layer`] that appends events to the log file with
/// timestamps and ANSI codes stripped.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log file according to `settings` and write a run header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be
    /// created or written.
    pub(super) fn new(settings: &FileSettings) -> std::io::Result<Self> {
        if let Some(parent) = settings.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(settings.mode == FileMode::Append)
            .truncate(settings.mode == FileMode::Overwrite)
            .open(&settings.path)?;
        let version =
            option_env!("TMPL_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        writeln!(
            file,
            "==========================================\n\
             tmpl {version} {} [{}]\n\
             ==========================================",
            format_utc_datetime(),
            std::process::id(),
        )?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = strip_ansi(&extractor.message);
        let ts = format_utc_time();

        let line = match (level, target) {
            (tracing::Level::INFO, STAGE_TARGET) => format!("[{ts}] INF :: {msg}"),
            (tracing::Level::INFO, SUBSTEP_TARGET) => format!("[{ts}] INF --> {msg}"),
            (tracing::Level::INFO, DRY_RUN_TARGET) => format!("[{ts}] INF [dry run] {msg}"),
            (tracing::Level::INFO, PRINT_TARGET) => format!("[{ts}] INF [print] {msg}"),
            (tracing::Level::ERROR, _) => format!("[{ts}] ERR {msg}"),
            (tracing::Level::WARN, _) => format!("[{ts}] WAR {msg}"),
            (tracing::Level::INFO, _) => format!("[{ts}] INF {msg}"),
            _ => format!("[{ts}] DEB {msg}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits `tmpl`-style
/// console output.
pub(super) struct ConsoleFormatter {
    pub(super) color: bool,
}

impl ConsoleFormatter {
    pub(super) fn render(&self, level: tracing::Level, target: &str, msg: &str) -> String {
        let line = match level {
            tracing::Level::ERROR => format!("\x1b[31mERROR: {msg}\x1b[0m"),
            tracing::Level::WARN => format!("\x1b[33mWARNING: {msg}\x1b[0m"),
            tracing::Level::INFO if target == STAGE_TARGET => {
                format!("\x1b[34m::\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO if target == SUBSTEP_TARGET => {
                format!("  \x1b[34m-->\x1b[0m {msg}")
            }
            tracing::Level::INFO if target == DRY_RUN_TARGET => {
                format!("      \x1b[33m[DRY RUN]\x1b[0m {msg}")
            }
            tracing::Level::INFO if target == PRINT_TARGET => format!("      \x1b[34m{msg}\x1b[0m"),
            tracing::Level::INFO => format!("      {msg}"),
            _ => format!("      \x1b[2m{msg}\x1b[0m"),
        };
        if self.color { line } else { strip_ansi(&line) }
    }
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        writeln!(
            writer,
            "{}",
            self.render(*metadata.level(), metadata.target(), &extractor.message)
        )
    }
}

/// Whether an event is shown on the console.
///
/// Stage, sub-step, dry-run, and `print()` lines are always shown; plain
/// informational and debug messages only with `verbose`. `quiet` keeps
/// errors only.
fn console_enabled(settings: &LogSettings, metadata: &tracing::Metadata<'_>) -> bool {
    let level = *metadata.level();
    if settings.quiet {
        return level == tracing::Level::ERROR;
    }
    if level <= tracing::Level::WARN || settings.verbose {
        return true;
    }
    level == tracing::Level::INFO
        && [STAGE_TARGET, SUBSTEP_TARGET, DRY_RUN_TARGET, PRINT_TARGET].contains(&metadata.target())
}

/// Initialise the global [`tracing`] subscriber.
///
/// Console events go to stderr for warnings and errors and to stdout
/// otherwise. When `settings.file` is set, a file layer records events at
/// the configured level. Must be called once at program startup, before any
/// logging.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_subscriber(settings: &LogSettings) -> std::io::Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_settings = settings.clone();
    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter {
            color: settings.color,
        })
        .with_writer(make_writer)
        .with_filter(tracing_subscriber::filter::filter_fn(move |metadata| {
            console_enabled(&console_settings, metadata)
        }));

    let file_layer = settings
        .file
        .as_ref()
        .map(|file| {
            let filter = match file.level {
                FileLevel::Info => LevelFilter::INFO,
                FileLevel::Debug => LevelFilter::DEBUG,
            };
            FileLayer::new(file).map(|layer| layer.with_filter(filter))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}
