use std::io::Write as _;
use std::process::ExitCode;

use clap::Parser;

use tmpl_cli::cli::Cli;
use tmpl_cli::error::{EnvironmentError, TmplError};
use tmpl_cli::{commands, logging};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let settings = args.log_settings();
    if let Err(source) = logging::init_subscriber(&settings) {
        let err = TmplError::from(EnvironmentError::LogFile {
            path: args.log_file.clone().unwrap_or_default(),
            source,
        });
        let _ = writeln!(std::io::stderr(), "ERROR: {err}");
        return ExitCode::from(err.exit_code());
    }

    let log = logging::Logger::new(args.log_file.clone());
    match commands::run(&args, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log.error(&err.to_string());
            ExitCode::from(err.exit_code())
        }
    }
}
