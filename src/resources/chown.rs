use anyhow::Result;
use std::ffi::OsStr;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};
use crate::exec;

/// An ownership change on an output file, applied with the external `chown`.
#[derive(Debug, Clone)]
pub struct ChownResource {
    /// Target file path (absolute).
    pub target: PathBuf,
    /// Arguments passed to `chown` before the target (`user[:group]`, flags).
    pub args: Vec<String>,
}

impl ChownResource {
    /// Create a new chown resource.
    #[must_use]
    pub const fn new(target: PathBuf, args: Vec<String>) -> Self {
        Self { target, args }
    }

    /// Parse a single numeric `uid[:gid]` owner token.
    fn numeric_owner(&self) -> Option<(u32, Option<u32>)> {
        let [owner] = self.args.as_slice() else {
            return None;
        };
        let (uid, gid) = match owner.split_once(':') {
            Some((uid, gid)) => (uid, Some(gid)),
            None => (owner.as_str(), None),
        };
        let uid = uid.parse().ok()?;
        let gid = match gid {
            Some(g) => Some(g.parse().ok()?),
            None => None,
        };
        Some((uid, gid))
    }
}

impl Resource for ChownResource {
    fn description(&self) -> String {
        format!("chown {} {}", self.args.join(" "), self.target.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Ok(meta) = std::fs::metadata(&self.target) else {
            return Ok(ResourceState::Invalid {
                reason: format!("target does not exist: {}", self.target.display()),
            });
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt as _;
            if let Some((uid, gid)) = self.numeric_owner() {
                let matches = meta.uid() == uid && gid.is_none_or(|g| meta.gid() == g);
                if matches {
                    return Ok(ResourceState::Correct);
                }
                return Ok(ResourceState::Incorrect {
                    current: format!("{}:{}", meta.uid(), meta.gid()),
                });
            }
        }

        #[cfg(not(unix))]
        let _ = (meta, self.numeric_owner());

        // Owner names would need a user database lookup; let chown decide.
        Ok(ResourceState::Incorrect {
            current: "unknown".to_string(),
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut args: Vec<&OsStr> = self.args.iter().map(OsStr::new).collect();
        args.push(self.target.as_os_str());
        exec::run("chown", &args)?;
        Ok(ResourceChange::Applied)
    }
}
