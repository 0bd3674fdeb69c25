//! Symlink resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, remove_symlink};
use super::{Resource, ResourceChange, ResourceState};

/// A symlink from `link` to an output file.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// Where the symlink lives.
    pub link: PathBuf,
    /// What the symlink points to.
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(link: PathBuf, target: PathBuf) -> Self {
        Self { link, target }
    }
}

impl Resource for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.link.display(), self.target.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Ok(meta) = self.link.symlink_metadata() else {
            return Ok(ResourceState::Missing);
        };
        if !meta.file_type().is_symlink() {
            let kind = if meta.is_dir() { "directory" } else { "regular file" };
            return Ok(ResourceState::Invalid {
                reason: format!("link location is an existing {kind}"),
            });
        }

        let existing = std::fs::read_link(&self.link)
            .with_context(|| format!("read link: {}", self.link.display()))?;
        if paths_equal(&existing, &self.target) {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("points to {}", existing.display()),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.link)?;
        remove_symlink(&self.link)?;
        create_symlink(&self.target, &self.link)?;
        Ok(ResourceChange::Applied)
    }
}

/// Compare two paths for equality, ignoring verbatim prefixes.
fn paths_equal(a: &Path, b: &Path) -> bool {
    dunce::simplified(a) == dunce::simplified(b)
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "create symlink {} -> {}",
                link.display(),
                target.display()
            )
        })
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!(
            "symlinks are not supported on this platform: {} -> {}",
            link.display(),
            target.display()
        )
    }
}
