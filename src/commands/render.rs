//! Command: render the declared file set and synchronize it into the output
//! directory.
use crate::cli::Cli;
use crate::error::TmplError;
use crate::logging::{Logger, StepStatus};
use crate::mapping::{self, compute_mapping};
use crate::render::stage_all;
use crate::sync::{MetadataOptions, Mirror, MirrorRequest, synchronize};

use super::{RunSetup, prepare};

/// Run the full pipeline: load, validate, map, render, transfer, and apply
/// metadata.
///
/// # Errors
///
/// Returns the [`TmplError`] of the first failing stage; nothing after it
/// runs.
pub fn execute(
    setup: &RunSetup,
    cli: &Cli,
    mirror: &dyn Mirror,
    log: &Logger,
) -> Result<(), TmplError> {
    let (doc, engine) = prepare(setup, cli, log)?;

    log.stage("Computing template path mapping...");
    let mapping = compute_mapping(&doc, &setup.roots)?;
    log.debug_block("mapping", &mapping::to_yaml(&mapping));
    log.record_step(
        "mapping",
        StepStatus::Ok,
        Some(&format!("{} files", mapping.len())),
    );

    let staged = stage_all(&engine, &doc, &mapping, log)?;
    log.record_step(
        "render",
        StepStatus::Ok,
        Some(&format!(
            "{} rendered, {} copied",
            staged.rendered, staged.copied
        )),
    );

    let request = MirrorRequest {
        source: setup.roots.working.clone(),
        destination: setup.roots.output.clone(),
        delete: cli.delete,
        dry_run: cli.dry_run,
        excludes: cli.exclude.clone(),
    };
    let metadata = MetadataOptions {
        chmod: !cli.no_chmod,
        chown: !cli.no_chown,
        symlinks: !cli.no_symlinks,
        dry_run: cli.dry_run,
    };
    let applied = synchronize(mirror, &request, &mapping, metadata, log)?;
    let status = if cli.dry_run {
        StepStatus::DryRun
    } else {
        StepStatus::Ok
    };
    log.record_step(
        "transfer",
        status,
        Some(&setup.roots.output.display().to_string()),
    );
    log.record_step(
        "metadata",
        status,
        Some(&format!(
            "{} changed, {} unchanged",
            applied.applied, applied.unchanged
        )),
    );

    log.print_summary();
    Ok(())
}
