//! Permissions, ownership, and symlinks for synchronized output files.
use std::path::Path;

use crate::error::MetadataError;
use crate::logging::Log;
use crate::mapping::PathMapping;
use crate::resources::{
    ChmodResource, ChownResource, Resource, ResourceChange, ResourceState, SymlinkResource,
    split_args,
};

/// Which metadata kinds to apply, and whether to only report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MetadataOptions {
    /// Apply `chmod` declarations.
    pub chmod: bool,
    /// Apply `chown` declarations.
    pub chown: bool,
    /// Create `symlink` declarations.
    pub symlinks: bool,
    /// Log intended actions instead of performing them.
    pub dry_run: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            chmod: true,
            chown: true,
            symlinks: true,
            dry_run: false,
        }
    }
}

/// Counts of metadata actions, for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetadataSummary {
    /// Resources changed (or that would change in a dry run).
    pub applied: usize,
    /// Resources already in their desired state.
    pub unchanged: usize,
}

enum Outcome {
    Changed,
    Unchanged,
    Blocked(String),
}

/// Bring `resource` to its desired state unless it already is.
fn converge(resource: &dyn Resource) -> anyhow::Result<Outcome> {
    match resource.current_state()? {
        ResourceState::Correct => Ok(Outcome::Unchanged),
        ResourceState::Invalid { reason } => Ok(Outcome::Blocked(reason)),
        ResourceState::Missing | ResourceState::Incorrect { .. } => match resource.apply()? {
            ResourceChange::Applied => Ok(Outcome::Changed),
            ResourceChange::AlreadyCorrect => Ok(Outcome::Unchanged),
        },
    }
}

/// Apply chmod, chown, and symlink declarations for every mapping, in
/// mapping order.
///
/// # Errors
///
/// Returns the first [`MetadataError`]. A symlink location occupied by a
/// regular file or directory is never replaced.
pub fn apply_metadata(
    mapping: &[PathMapping],
    options: MetadataOptions,
    log: &dyn Log,
) -> Result<MetadataSummary, MetadataError> {
    log.substep("Processing symlinks, ownership, and permissions...");
    let mut summary = MetadataSummary::default();

    for m in mapping {
        if !m.chmod.is_empty() && options.chmod {
            let outcome = if options.dry_run {
                log.dry_run(&format!(
                    "Would set permissions of \"{}\" to \"{}\"",
                    m.dst_path.display(),
                    m.chmod
                ));
                Outcome::Changed
            } else {
                log.debug(&format!(
                    "Setting permissions of \"{}\" to \"{}\"...",
                    m.dst_path.display(),
                    m.chmod
                ));
                let resource = ChmodResource::new(m.dst_path.clone(), split_args(&m.chmod));
                converge(&resource).map_err(|e| chmod_error(m, format!("{e:#}")))?
            };
            tally(&mut summary, outcome).map_err(|reason| chmod_error(m, reason))?;
        }

        if !m.chown.is_empty() && options.chown {
            let outcome = if options.dry_run {
                log.dry_run(&format!(
                    "Would set ownership of \"{}\" to \"{}\"",
                    m.dst_path.display(),
                    m.chown
                ));
                Outcome::Changed
            } else {
                log.debug(&format!(
                    "Setting ownership of \"{}\" to \"{}\"...",
                    m.dst_path.display(),
                    m.chown
                ));
                let resource = ChownResource::new(m.dst_path.clone(), split_args(&m.chown));
                converge(&resource).map_err(|e| chown_error(m, format!("{e:#}")))?
            };
            tally(&mut summary, outcome).map_err(|reason| chown_error(m, reason))?;
        }

        if let Some(link) = &m.link_path
            && options.symlinks
        {
            let outcome = if options.dry_run {
                log.dry_run(&format!(
                    "Would link \"{}\" to \"{}\"",
                    link.display(),
                    m.dst_path.display()
                ));
                Outcome::Changed
            } else {
                log.debug(&format!("Processing symlink for file \"{}\"...", m.dst_path.display()));
                let resource = SymlinkResource::new(link.clone(), m.dst_path.clone());
                converge(&resource).map_err(|e| MetadataError::Symlink {
                    link: link.clone(),
                    target: m.dst_path.clone(),
                    message: format!("{e:#}"),
                })?
            };
            tally(&mut summary, outcome).map_err(|_| collision(link, &m.dst_path))?;
        }
    }

    Ok(summary)
}

fn tally(summary: &mut MetadataSummary, outcome: Outcome) -> Result<(), String> {
    match outcome {
        Outcome::Changed => summary.applied += 1,
        Outcome::Unchanged => summary.unchanged += 1,
        Outcome::Blocked(reason) => return Err(reason),
    }
    Ok(())
}

fn chmod_error(m: &PathMapping, message: String) -> MetadataError {
    MetadataError::Chmod {
        path: m.dst_path.clone(),
        mode: m.chmod.clone(),
        message,
    }
}

fn chown_error(m: &PathMapping, message: String) -> MetadataError {
    MetadataError::Chown {
        path: m.dst_path.clone(),
        owner: m.chown.clone(),
        message,
    }
}

fn collision(link: &Path, target: &Path) -> MetadataError {
    MetadataError::SymlinkCollision {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
    }
}
