use anyhow::Result;
use std::ffi::OsStr;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec;

/// A permission change on an output file, applied with the external `chmod`.
///
/// `args` are the whitespace-split words of the declared `chmod` value, so
/// both plain octal modes (`"600"`) and flagged symbolic forms
/// (`"-R u+rwX,go-w"`) are accepted.
#[derive(Debug, Clone)]
pub struct ChmodResource {
    /// Target file path (absolute).
    pub target: PathBuf,
    /// Arguments passed to `chmod` before the target.
    pub args: Vec<String>,
}

impl ChmodResource {
    /// Create a new chmod resource.
    #[must_use]
    pub const fn new(target: PathBuf, args: Vec<String>) -> Self {
        Self { target, args }
    }

    /// Parse the mode when `args` is a single octal token.
    fn octal_mode(&self) -> Option<u32> {
        match self.args.as_slice() {
            [mode] => u32::from_str_radix(mode, 8).ok(),
            _ => None,
        }
    }
}

impl Resource for ChmodResource {
    fn description(&self) -> String {
        format!("chmod {} {}", self.args.join(" "), self.target.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Ok(meta) = std::fs::metadata(&self.target) else {
            return Ok(ResourceState::Invalid {
                reason: format!("target does not exist: {}", self.target.display()),
            });
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            if let Some(desired) = self.octal_mode() {
                let current = meta.permissions().mode() & 0o7777;
                if current == desired {
                    return Ok(ResourceState::Correct);
                }
                return Ok(ResourceState::Incorrect {
                    current: format!("{current:o}"),
                });
            }
        }

        #[cfg(not(unix))]
        let _ = (meta, self.octal_mode());

        // Symbolic modes cannot be compared without evaluating them.
        Ok(ResourceState::Incorrect {
            current: "unknown".to_string(),
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut args: Vec<&OsStr> = self.args.iter().map(OsStr::new).collect();
        args.push(self.target.as_os_str());
        exec::run("chmod", &args)?;
        Ok(ResourceChange::Applied)
    }
}
