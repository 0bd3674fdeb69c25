//! Pipeline orchestration for the two run modes.
pub mod render;
pub mod stdin;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{self, ConfigDocument};
use crate::error::{EnvironmentError, TmplError};
use crate::host::HostInfo;
use crate::logging::{Logger, StepStatus};
use crate::mapping::MappingRoots;
use crate::paths;
use crate::render::Engine;

/// Fallback used when `rsync` is not on `PATH`.
const DEFAULT_RSYNC: &str = "/usr/bin/rsync";

/// Run the mode selected by `cli`.
///
/// # Errors
///
/// Returns the first [`TmplError`] of the run; its
/// [`exit_code`](TmplError::exit_code) is the process status.
pub fn run(cli: &Cli, log: &Logger) -> Result<(), TmplError> {
    let host = HostInfo::detect();
    let setup = RunSetup::init(cli, host, log)?;
    if cli.stdin {
        let mut input = std::io::stdin().lock();
        let mut output = std::io::stdout().lock();
        stdin::execute(&setup, cli, &mut input, &mut output, log)
    } else {
        let mirror = crate::sync::Rsync::new(&setup.rsync);
        render::execute(&setup, cli, &mirror, log)
    }
}

/// Validated environment of a single run.
#[derive(Debug, Clone)]
pub struct RunSetup {
    /// Host names exposed to templates and used for configuration selection.
    pub host: HostInfo,
    /// Selected configuration file.
    pub config_path: PathBuf,
    /// Template, output, and working roots.
    pub roots: MappingRoots,
    /// Mirror executable (unused in stdin mode).
    pub rsync: PathBuf,
}

impl RunSetup {
    /// Validate the environment described by `cli`.
    ///
    /// Outside stdin mode the working directory is deleted and recreated.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError`] for a missing rsync executable, base
    /// directory, or configuration file, and for an unusable working
    /// directory.
    pub fn init(cli: &Cli, host: HostInfo, log: &Logger) -> Result<Self, EnvironmentError> {
        log.stage("Validating execution environment...");
        let cwd = std::env::current_dir().map_err(EnvironmentError::CurrentDir)?;

        let rsync = cli
            .rsync_executable
            .clone()
            .or_else(|| which::which("rsync").ok())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RSYNC));
        if !cli.stdin {
            log.substep("Validating rsync executable path...");
            if !rsync.is_file() {
                return Err(EnvironmentError::MissingRsync(rsync));
            }
        }

        let base_dir = match &cli.base_dir {
            Some(dir) => {
                log.substep("Validating template base directory...");
                let dir = absolute(dir, &cwd);
                if !dir.is_dir() {
                    return Err(EnvironmentError::MissingBaseDir(dir));
                }
                Some(dir)
            }
            None => None,
        };

        log.substep("Validating template configuration file path...");
        let config_path = config::select::select_config(
            &absolute(&cli.template_conf, &cwd),
            &host.hostname,
            &host.fqdn,
        )?;
        log.info(&format!(
            "Selected template configuration file \"{}\".",
            config_path.display()
        ));

        let template = base_dir.unwrap_or_else(|| {
            config_path
                .parent()
                .map_or_else(|| cwd.clone(), Path::to_path_buf)
        });
        let template = dunce::canonicalize(&template).unwrap_or(template);
        let output = cli
            .output
            .as_deref()
            .map_or_else(|| cwd.clone(), |o| paths::resolve(o, &cwd));
        let working = paths::resolve(&cli.working_directory, &cwd);

        if !cli.stdin {
            log.substep("Preparing working directory...");
            reset_working_dir(&working)?;
        }

        Ok(Self {
            host,
            config_path,
            roots: MappingRoots {
                template,
                output,
                working,
            },
            rsync,
        })
    }
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    paths::resolve(&path.to_string_lossy(), cwd)
}

/// Delete and recreate `dir`, refusing to touch a regular file.
fn reset_working_dir(dir: &Path) -> Result<(), EnvironmentError> {
    let io_error = |source| EnvironmentError::WorkingDir {
        path: dir.to_path_buf(),
        source,
    };
    if dir.is_file() {
        return Err(EnvironmentError::WorkingDirIsFile(dir.to_path_buf()));
    }
    if dir.is_dir() {
        std::fs::remove_dir_all(dir).map_err(io_error)?;
    }
    std::fs::create_dir_all(dir).map_err(io_error)
}

/// Load and validate the configuration, then build an engine with every
/// extension library imported.
///
/// # Errors
///
/// Returns the [`TmplError`] of the first failing stage.
pub fn prepare(
    setup: &RunSetup,
    cli: &Cli,
    log: &Logger,
) -> Result<(ConfigDocument, Engine), TmplError> {
    log.stage("Loading template configuration...");
    let doc = config::load(&setup.config_path)?;
    log.debug_block("configuration", &doc.to_yaml());

    log.stage("Validating template configuration...");
    config::validate(&doc)?;

    log.stage("Initializing template engine...");
    let mut engine = Engine::new(
        &setup.roots.template,
        &setup.roots.output,
        &setup.host,
        &cli.engine_settings(),
    )?;

    let libraries = doc.lib_paths()?;
    if !libraries.is_empty() {
        log.stage("Loading library extensions...");
        let mut seen = HashSet::new();
        for path in &libraries {
            log.substep(&path.display().to_string());
            for export in engine.load_library(path)? {
                if !seen.insert(export.name.clone()) {
                    log.debug(&format!(
                        "\"{}\" from \"{}\" replaces an earlier library export",
                        export.name,
                        path.display()
                    ));
                }
                log.debug(&format!(
                    "Registered {} \"{}\"",
                    if export.callable { "macro" } else { "value" },
                    export.name
                ));
            }
        }
        log.record_step(
            "libraries",
            StepStatus::Ok,
            Some(&format!("{} imported", libraries.len())),
        );
    }

    Ok((doc, engine))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::Parser as _;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tmpl").chain(args.iter().copied())).unwrap()
    }

    struct Dirs {
        _dir: tempfile::TempDir,
        root: PathBuf,
        rsync: String,
    }

    fn dirs() -> Dirs {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        std::fs::create_dir_all(root.join("templates")).unwrap();
        std::fs::write(root.join("templates/tmpl.yaml"), "files: []\n").unwrap();
        let rsync = root.join("rsync");
        std::fs::write(&rsync, "").unwrap();
        Dirs {
            _dir: dir,
            rsync: rsync.display().to_string(),
            root,
        }
    }

    fn host() -> HostInfo {
        HostInfo::new("web01", "web01.example.com")
    }

    #[test]
    fn init_selects_config_and_resets_working_dir() {
        let d = dirs();
        let work = d.root.join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join("stale.txt"), "old").unwrap();

        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            &d.rsync,
            "-o",
            d.root.join("out").to_str().unwrap(),
            "-w",
            work.to_str().unwrap(),
        ]);
        let setup = RunSetup::init(&c, host(), &Logger::default()).unwrap();

        assert_eq!(setup.config_path, d.root.join("templates/tmpl.yaml"));
        assert_eq!(setup.roots.template, d.root.join("templates"));
        assert_eq!(setup.roots.output, d.root.join("out"));
        assert!(work.is_dir());
        assert!(!work.join("stale.txt").exists());
    }

    #[test]
    fn init_rejects_missing_rsync() {
        let d = dirs();
        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            "/nonexistent/rsync",
        ]);
        let err = RunSetup::init(&c, host(), &Logger::default()).unwrap_err();
        assert!(matches!(err, EnvironmentError::MissingRsync(_)), "{err}");
    }

    #[test]
    fn init_rejects_missing_base_dir() {
        let d = dirs();
        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            &d.rsync,
            "-b",
            d.root.join("nope").to_str().unwrap(),
        ]);
        let err = RunSetup::init(&c, host(), &Logger::default()).unwrap_err();
        assert!(matches!(err, EnvironmentError::MissingBaseDir(_)), "{err}");
    }

    #[test]
    fn init_refuses_file_as_working_dir() {
        let d = dirs();
        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            &d.rsync,
            "-w",
            &d.rsync,
        ]);
        let err = RunSetup::init(&c, host(), &Logger::default()).unwrap_err();
        assert!(matches!(err, EnvironmentError::WorkingDirIsFile(_)), "{err}");
    }

    #[test]
    fn stdin_mode_skips_rsync_and_working_dir() {
        let d = dirs();
        let work = d.root.join("work");
        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            "/nonexistent/rsync",
            "-w",
            work.to_str().unwrap(),
            "--stdin",
        ]);
        RunSetup::init(&c, host(), &Logger::default()).unwrap();
        assert!(!work.exists());
    }

    #[test]
    fn prepare_registers_libraries() {
        let d = dirs();
        std::fs::write(
            d.root.join("templates/tmpl.yaml"),
            "lib: [macros.j2]\nfiles: []\n",
        )
        .unwrap();
        std::fs::write(
            d.root.join("templates/macros.j2"),
            "{% macro shout(s) %}{{ s | upper }}{% endmacro %}",
        )
        .unwrap();
        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            &d.rsync,
            "-w",
            d.root.join("work").to_str().unwrap(),
        ]);
        let log = Logger::default();
        let setup = RunSetup::init(&c, host(), &log).unwrap();
        let (_doc, engine) = prepare(&setup, &c, &log).unwrap();

        assert_eq!(
            engine
                .render_source("{{ shout('hi') }}", &minijinja::context! {})
                .unwrap(),
            "HI"
        );
        assert_eq!(log.step_entries()[0].name, "libraries");
    }

    #[test]
    fn prepare_reports_validation_failure() {
        let d = dirs();
        std::fs::write(d.root.join("templates/tmpl.yaml"), "files: [{src: a}]\n").unwrap();
        let c = cli(&[
            d.root.join("templates").to_str().unwrap(),
            "--rsync-executable",
            &d.rsync,
            "-w",
            d.root.join("work").to_str().unwrap(),
        ]);
        let log = Logger::default();
        let setup = RunSetup::init(&c, host(), &log).unwrap();
        let err = prepare(&setup, &c, &log).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
