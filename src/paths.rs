//! Lexical path helpers shared by the loader, mapper, and CLI.
use std::path::{Component, Path, PathBuf};

/// Resolve a path written in a configuration document.
///
/// Absolute paths are returned as-is, a leading `~` expands to the home
/// directory, and anything else is joined onto `base` and normalized.
#[must_use]
pub fn resolve(spec: &str, base: &Path) -> PathBuf {
    if let Some(expanded) = expand_home(spec) {
        return expanded;
    }
    let path = Path::new(spec);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    normalize(&base.join(path))
}

/// Expand a leading `~` (alone or followed by `/`) to the home directory.
///
/// Returns `None` when `spec` does not start with `~` or the home directory
/// is unknown.
#[must_use]
pub fn expand_home(spec: &str) -> Option<PathBuf> {
    let rest = spec.strip_prefix('~')?;
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }
    let home = dirs::home_dir()?;
    Some(home.join(rest.trim_start_matches('/')))
}

/// Collapse `.` and `..` components without touching the filesystem.
///
/// `..` at the root of an absolute path is dropped; leading `..` in a
/// relative path is kept.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Express `path` relative to `base`, inserting `..` where `path` leaves it.
///
/// Both paths are normalized first; they are expected to be both absolute
/// or both relative.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in path_parts.iter().skip(common) {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Returns `true` when `path` is `root` or lies beneath it (lexically).
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}
