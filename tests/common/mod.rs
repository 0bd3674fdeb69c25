// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed template tree and a fluent builder
// so each integration test can describe its configuration, templates, and
// command line without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser as _;

use tmpl_cli::cli::Cli;
use tmpl_cli::commands::{self, RunSetup};
use tmpl_cli::error::{TmplError, TransferError};
use tmpl_cli::host::HostInfo;
use tmpl_cli::logging::Logger;
use tmpl_cli::sync::{Mirror, MirrorOutcome, MirrorRequest};

/// A [`Mirror`] that copies the working tree in-process and records every
/// request it receives.
#[derive(Debug, Default)]
pub struct CopyMirror {
    pub requests: Mutex<Vec<MirrorRequest>>,
}

impl CopyMirror {
    pub fn requests(&self) -> Vec<MirrorRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl Mirror for CopyMirror {
    fn name(&self) -> String {
        "copy".to_string()
    }

    fn mirror(&self, request: &MirrorRequest) -> Result<MirrorOutcome, TransferError> {
        self.requests
            .lock()
            .expect("lock requests")
            .push(request.clone());
        let mut lines = Vec::new();
        copy_tree(
            &request.source,
            &request.destination,
            request.dry_run,
            &mut lines,
        )
        .map_err(|e| TransferError::Spawn {
            tool: self.name(),
            message: e.to_string(),
        })?;
        Ok(MirrorOutcome {
            success: true,
            code: Some(0),
            lines,
        })
    }
}

fn copy_tree(src: &Path, dst: &Path, dry_run: bool, lines: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            if !dry_run {
                std::fs::create_dir_all(&target)?;
            }
            copy_tree(&entry.path(), &target, dry_run, lines)?;
        } else {
            lines.push(target.display().to_string());
            if !dry_run {
                std::fs::copy(entry.path(), &target)?;
            }
        }
    }
    Ok(())
}

/// An isolated template tree backed by a [`tempfile::TempDir`].
///
/// Layout under the (canonicalized) temporary root:
/// - `templates/`: template root holding `tmpl.yaml`
/// - `out/`: output directory
/// - `work/`: working directory
/// - `rsync`: empty file standing in for the rsync executable
pub struct TemplateFixture {
    _dir: tempfile::TempDir,
    pub root: PathBuf,
    extra_args: Vec<String>,
}

impl TemplateFixture {
    /// Create a fixture whose configuration is `config_yaml`.
    pub fn new(config_yaml: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dunce::canonicalize(dir.path()).expect("canonicalize temp dir");
        std::fs::create_dir_all(root.join("templates")).expect("create template dir");
        std::fs::write(root.join("rsync"), "").expect("write rsync stand-in");
        let fixture = Self {
            _dir: dir,
            root,
            extra_args: Vec::new(),
        };
        fixture.template("tmpl.yaml", config_yaml)
    }

    /// Write a file below the template root.
    pub fn template(self, rel: &str, content: &str) -> Self {
        let path = self.template_dir().join(rel);
        std::fs::create_dir_all(path.parent().expect("template parent"))
            .expect("create template parent");
        std::fs::write(path, content).expect("write template");
        self
    }

    /// Append command-line arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.extra_args.extend(args.iter().map(ToString::to_string));
        self
    }

    pub fn template_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    pub fn working_dir(&self) -> PathBuf {
        self.root.join("work")
    }

    /// Contents of an output file.
    pub fn output(&self, rel: &str) -> String {
        std::fs::read_to_string(self.output_dir().join(rel))
            .unwrap_or_else(|e| panic!("read output {rel}: {e}"))
    }

    /// The parsed command line for this fixture.
    pub fn cli(&self) -> Cli {
        let mut argv = vec![
            "tmpl".to_string(),
            self.template_dir().display().to_string(),
            "--rsync-executable".to_string(),
            self.root.join("rsync").display().to_string(),
            "-o".to_string(),
            self.output_dir().display().to_string(),
            "-w".to_string(),
            self.working_dir().display().to_string(),
        ];
        argv.extend(self.extra_args.iter().cloned());
        Cli::try_parse_from(argv).expect("parse command line")
    }

    /// Run the file-set pipeline through `mirror`.
    pub fn run_with(&self, mirror: &CopyMirror) -> Result<(), TmplError> {
        let cli = self.cli();
        let log = Logger::default();
        let setup = RunSetup::init(&cli, host(), &log)?;
        commands::render::execute(&setup, &cli, mirror, &log)
    }

    /// Run the file-set pipeline through a fresh [`CopyMirror`].
    pub fn run(&self) -> Result<(), TmplError> {
        self.run_with(&CopyMirror::default())
    }
}

/// Fixed host identity so tests do not depend on the machine.
pub fn host() -> HostInfo {
    HostInfo::new("web01", "web01.example.com")
}
