//! Directory mirroring collaborator.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::TransferError;
use crate::exec;

/// What to mirror and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    /// Staging directory whose contents are transferred.
    pub source: PathBuf,
    /// Output directory receiving them.
    pub destination: PathBuf,
    /// Remove destination files that do not exist in `source`.
    pub delete: bool,
    /// Report what would change without touching `destination`.
    pub dry_run: bool,
    /// Paths excluded from the transfer.
    pub excludes: Vec<String>,
}

/// Output of a finished mirror run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOutcome {
    /// Whether the transfer succeeded.
    pub success: bool,
    /// Tool exit status, `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Non-empty output lines.
    pub lines: Vec<String>,
}

/// Something that can make one directory tree look like another.
#[cfg_attr(test, mockall::automock)]
pub trait Mirror {
    /// Name used in diagnostics.
    fn name(&self) -> String;

    /// Run the transfer described by `request`.
    ///
    /// A tool that runs but fails is reported through
    /// [`MirrorOutcome::success`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Spawn`] if the transfer cannot be started.
    fn mirror(&self, request: &MirrorRequest) -> Result<MirrorOutcome, TransferError>;
}

/// [`Mirror`] backed by an external `rsync` executable.
#[derive(Debug, Clone)]
pub struct Rsync {
    executable: PathBuf,
}

impl Rsync {
    /// Use the `rsync` at `executable`.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Command-line arguments for `request`.
    #[must_use]
    pub fn arguments(request: &MirrorRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-a", "-h", "--progress"].map(OsString::from).to_vec();
        if request.delete {
            args.push("--delete".into());
        }
        if request.dry_run {
            args.push("--dry-run".into());
        }
        for exclude in &request.excludes {
            args.push("--exclude".into());
            args.push(exclude.into());
        }
        args.push(with_trailing_slash(&request.source));
        args.push(with_trailing_slash(&request.destination));
        args
    }
}

impl Mirror for Rsync {
    fn name(&self) -> String {
        "rsync".to_string()
    }

    fn mirror(&self, request: &MirrorRequest) -> Result<MirrorOutcome, TransferError> {
        let result = exec::run_unchecked(&self.executable, &Self::arguments(request)).map_err(
            |e| TransferError::Spawn {
                tool: self.name(),
                message: format!("{e:#}"),
            },
        )?;
        Ok(MirrorOutcome {
            success: result.success,
            code: result.code,
            lines: result.lines().map(String::from).collect(),
        })
    }
}

/// `dir/` so rsync copies the contents of `dir` rather than `dir` itself.
fn with_trailing_slash(dir: &Path) -> OsString {
    let mut s = dir.as_os_str().to_owned();
    if !s.to_string_lossy().ends_with('/') {
        s.push("/");
    }
    s
}
