//! Output synchronization: mirror the working directory onto the output
//! directory, then apply per-file metadata.
mod metadata;
mod mirror;

pub use metadata::{MetadataOptions, MetadataSummary, apply_metadata};
pub use mirror::{Mirror, MirrorOutcome, MirrorRequest, Rsync};

use crate::error::{TmplError, TransferError};
use crate::logging::Log;
use crate::mapping::PathMapping;

/// Mirror `request.source` onto `request.destination` and apply metadata for
/// every mapping.
///
/// The destination is created first unless this is a dry run.
///
/// # Errors
///
/// Returns [`TmplError::Transfer`] if the mirror fails and
/// [`TmplError::Metadata`] if chmod, chown, or symlink processing fails.
pub fn synchronize(
    mirror: &dyn Mirror,
    request: &MirrorRequest,
    mapping: &[PathMapping],
    metadata: MetadataOptions,
    log: &dyn Log,
) -> Result<MetadataSummary, TmplError> {
    if request.dry_run {
        log.stage("Finalizing translation process (DRY RUN)...");
    } else {
        log.stage("Finalizing translation process...");
        if !request.destination.is_dir() {
            log.substep("Creating output directory...");
            std::fs::create_dir_all(&request.destination).map_err(|source| {
                TransferError::CreateOutput {
                    path: request.destination.clone(),
                    source,
                }
            })?;
        }
    }

    log.substep("Transferring files to output directory...");
    let outcome = mirror.mirror(request)?;
    let tool = mirror.name();
    log.debug(&format!(
        "{tool} exit code: {}",
        outcome.code.map_or_else(|| "signal".to_string(), |c| c.to_string())
    ));
    if !outcome.success {
        for line in &outcome.lines {
            log.error(&format!("{tool}: {line}"));
        }
        return Err(TransferError::Exit {
            tool,
            code: outcome.code.unwrap_or(-1),
        }
        .into());
    }
    for line in &outcome.lines {
        log.debug(&format!("{tool}: {line}"));
    }

    Ok(apply_metadata(
        mapping,
        MetadataOptions {
            dry_run: request.dry_run,
            ..metadata
        },
        log,
    )?)
}
