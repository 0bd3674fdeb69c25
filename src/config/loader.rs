//! Recursive configuration loading with `include` resolution.
//!
//! A document may pull in other documents:
//!
//! ```yaml
//! include:
//!   - common/base.yaml
//!   - roles/*.yaml
//! motd: "managed by tmpl"
//! ```
//!
//! Includes are loaded in the order written and merged into an accumulator;
//! the including document is merged last, so its own keys take precedence
//! over anything it includes.
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use super::document::ConfigDocument;
use super::merge::deep_merge;
use crate::error::ConfigError;
use crate::pathspec;

const INCLUDE_KEY: &str = "include";

/// Load the document at `path`, resolving includes recursively.
///
/// # Errors
///
/// Returns [`ConfigError`] if any document is missing, unreadable, not a
/// mapping, declares a malformed `include`, or includes itself.
pub fn load(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let source = canonical(path)?;
    let mut chain = Vec::new();
    let data = load_recursive(&source, &mut chain)?;
    Ok(ConfigDocument::new(data, source))
}

fn canonical(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    dunce::canonicalize(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_recursive(path: &Path, chain: &mut Vec<PathBuf>) -> Result<Mapping, ConfigError> {
    if chain.iter().any(|p| p == path) {
        return Err(ConfigError::IncludeCycle {
            path: path.to_path_buf(),
        });
    }
    chain.push(path.to_path_buf());

    let mut own = parse_file(path)?;
    let includes = take_includes(path, &mut own)?;

    let mut merged = Value::Mapping(Mapping::new());
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    for include in include_paths(path, dir, &includes)? {
        let included = load_recursive(&include, chain)?;
        merged = deep_merge(merged, Value::Mapping(included));
    }
    merged = deep_merge(merged, Value::Mapping(own));

    chain.pop();
    match merged {
        Value::Mapping(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Read and parse a single document without following includes.
///
/// Files ending in `.toml` are parsed as TOML; everything else as YAML. An
/// empty document is treated as an empty mapping.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed, or its top
/// level is not a mapping.
pub fn parse_file(path: &Path) -> Result<Mapping, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value = if path.extension().is_some_and(|ext| ext == "toml") {
        parse_toml(path, &content)?
    } else {
        serde_yaml::from_str::<Value>(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

fn parse_toml(path: &Path, content: &str) -> Result<Value, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    let table: toml::Table = toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
    serde_yaml::to_value(table).map_err(|e| parse_error(e.to_string()))
}

/// Remove `include` from `doc` and return its entries.
fn take_includes(path: &Path, doc: &mut Mapping) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = doc.get(INCLUDE_KEY).cloned() else {
        return Ok(Vec::new());
    };
    *doc = std::mem::take(doc)
        .into_iter()
        .filter(|(k, _)| k.as_str() != Some(INCLUDE_KEY))
        .collect();

    let not_a_list = || ConfigError::Include {
        path: path.to_path_buf(),
        reason: "include specification is not a list of path specifications".to_string(),
    };
    let Value::Sequence(entries) = raw else {
        return Err(not_a_list());
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            Value::String(s) => Ok(s),
            _ => Err(not_a_list()),
        })
        .collect()
}

/// Expand include specifications relative to `dir` into canonical file paths.
fn include_paths(path: &Path, dir: &Path, specs: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let expanded = pathspec::expand_all(specs, dir).map_err(|e| ConfigError::Include {
        path: path.to_path_buf(),
        reason: format!("parsing error - {e}"),
    })?;

    expanded
        .into_iter()
        .map(|p| {
            let candidate = PathBuf::from(&p);
            if !candidate.is_file() {
                return Err(ConfigError::Include {
                    path: path.to_path_buf(),
                    reason: format!("\"{p}\" does not exist"),
                });
            }
            dunce::canonicalize(&candidate).map_err(|source| ConfigError::Io {
                path: candidate,
                source,
            })
        })
        .collect()
}
