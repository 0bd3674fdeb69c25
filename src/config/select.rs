//! Selection of a configuration file from a directory.
use std::path::{Path, PathBuf};

use crate::error::EnvironmentError;

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Resolve the `TEMPLATE_CONF` argument to a configuration file.
///
/// A file is returned as-is. For a directory, the first existing candidate
/// wins:
///
/// 1. `tmpl.yaml`, `tmpl.yml`
/// 2. `<fqdn>.yaml`, `<fqdn>.yml`
/// 3. `<hostname>.yaml`, `<hostname>.yml`
/// 4. the first (sorted) `*.yaml`/`*.yml` whose stem is part of the hostname
///
/// # Errors
///
/// Returns [`EnvironmentError::MissingConfig`] if `path` does not exist and
/// [`EnvironmentError::NoSelectableConfig`] if a directory has no candidate.
pub fn select_config(path: &Path, hostname: &str, fqdn: &str) -> Result<PathBuf, EnvironmentError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(EnvironmentError::MissingConfig(path.to_path_buf()));
    }

    let named = ["tmpl", fqdn, hostname]
        .into_iter()
        .filter(|stem| !stem.is_empty())
        .flat_map(|stem| EXTENSIONS.map(|ext| path.join(format!("{stem}.{ext}"))))
        .find(|candidate| candidate.is_file());
    if let Some(found) = named {
        return Ok(found);
    }

    let mut partial: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|_| EnvironmentError::NoSelectableConfig(path.to_path_buf()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && has_config_extension(p))
        .filter(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| !stem.is_empty() && hostname.contains(stem))
        })
        .collect();
    partial.sort();

    partial
        .into_iter()
        .next()
        .ok_or_else(|| EnvironmentError::NoSelectableConfig(path.to_path_buf()))
}

fn has_config_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.contains(&e))
}
