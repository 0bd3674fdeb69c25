use std::path::PathBuf;

use clap::Parser;

use crate::logging::{FileLevel, FileMode, FileSettings, LogSettings};
use crate::render::EngineSettings;

/// Version reported by `--version`.
pub const VERSION: &str = match option_env!("TMPL_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Render a declarative set of template files and synchronize them into an
/// output directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "tmpl", version = VERSION)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Template configuration file, or a directory to select one from
    pub template_conf: PathBuf,

    /// Base directory templates are resolved against [default: directory of the configuration file]
    #[arg(short, long, env = "TMPL_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Output directory [default: current directory]
    #[arg(short, long, env = "TMPL_OUTPUT")]
    pub output: Option<String>,

    /// Private staging directory, recreated on every run
    #[arg(short, long, env = "TMPL_WORKING_DIR", default_value = "/tmp/tmpl")]
    pub working_directory: String,

    /// Path to the rsync executable [default: rsync on PATH, else /usr/bin/rsync]
    #[arg(long, env = "TMPL_RSYNC_PATH")]
    pub rsync_executable: Option<PathBuf>,

    /// Paths excluded from the transfer to the output directory
    #[arg(long, env = "TMPL_EXCLUDE", num_args = 1.., value_delimiter = ' ')]
    pub exclude: Vec<String>,

    /// Remove files from the output directory that were not generated
    #[arg(long)]
    pub delete: bool,

    /// Report what would change without touching the output directory
    #[arg(short, long)]
    pub dry_run: bool,

    /// Render standard input to standard output instead of a file set
    #[arg(long)]
    pub stdin: bool,

    /// Do not apply "chmod" declarations
    #[arg(long)]
    pub no_chmod: bool,

    /// Do not apply "chown" declarations
    #[arg(long)]
    pub no_chown: bool,

    /// Do not create "symlink" declarations
    #[arg(long)]
    pub no_symlinks: bool,

    /// Disable colored console output
    #[arg(long)]
    pub no_color: bool,

    /// Keep the first newline after a block tag
    #[arg(long)]
    pub dont_trim_blocks: bool,

    #[command(flatten)]
    pub syntax: SyntaxOpts,

    /// Append log output to this file
    #[arg(short = 'f', long, env = "TMPL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log file verbosity
    #[arg(short = 'l', long, env = "TMPL_LOG_LEVEL", value_enum, default_value_t)]
    pub log_level: FileLevel,

    /// Whether the log file is appended to or overwritten
    #[arg(short = 'm', long, env = "TMPL_LOG_MODE", value_enum, default_value_t)]
    pub log_mode: FileMode,

    /// Show debug output on the console
    #[arg(short, long)]
    pub verbose: bool,
}

/// Template delimiter overrides.
#[derive(Parser, Debug, Clone)]
pub struct SyntaxOpts {
    /// String opening a block tag
    #[arg(long, env = "TMPL_BLOCK_START_STR", default_value = "{%")]
    pub block_start_string: String,

    /// String closing a block tag
    #[arg(long, env = "TMPL_BLOCK_END_STR", default_value = "%}")]
    pub block_end_string: String,

    /// String opening a variable expression
    #[arg(long, env = "TMPL_VAR_START_STR", default_value = "{{")]
    pub variable_start_string: String,

    /// String closing a variable expression
    #[arg(long, env = "TMPL_VAR_END_STR", default_value = "}}")]
    pub variable_end_string: String,

    /// String opening a comment
    #[arg(long, env = "TMPL_COMMENT_START_STR", default_value = "{#")]
    pub comment_start_string: String,

    /// String closing a comment
    #[arg(long, env = "TMPL_COMMENT_END_STR", default_value = "#}")]
    pub comment_end_string: String,
}

impl Cli {
    /// Template engine settings selected on the command line.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            block_start: self.syntax.block_start_string.clone(),
            block_end: self.syntax.block_end_string.clone(),
            variable_start: self.syntax.variable_start_string.clone(),
            variable_end: self.syntax.variable_end_string.clone(),
            comment_start: self.syntax.comment_start_string.clone(),
            comment_end: self.syntax.comment_end_string.clone(),
            trim_blocks: !self.dont_trim_blocks,
        }
    }

    /// Logging settings selected on the command line.
    ///
    /// Console output is limited to errors in stdin mode so standard output
    /// only carries the rendered template.
    #[must_use]
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            verbose: self.verbose,
            color: !self.no_color,
            quiet: self.stdin,
            file: self.log_file.as_ref().map(|path| FileSettings {
                path: path.clone(),
                level: self.log_level,
                mode: self.log_mode,
            }),
        }
    }
}
