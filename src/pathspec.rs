//! Path specification expansion.
//!
//! A path specification is a compact way to name one or more files:
//!
//! ```text
//! /foo/bar1.txt      ->  [/foo/bar1.txt]
//! /foo/bar*.txt      ->  [/foo/bar1.txt, /foo/bar2.txt, ...]   (filesystem glob)
//! /foo/**/*.txt      ->  every regular file below /foo ending in .txt
//! /foo/bar[1,2].txt  ->  [/foo/bar1.txt, /foo/bar2.txt]
//! /foo/bar[1-3].txt  ->  [/foo/bar1.txt, /foo/bar2.txt, /foo/bar3.txt]
//! ```
//!
//! Only globbing touches the filesystem; list and range expansions are
//! computed without checking that the resulting paths exist.
use std::path::Path;

use glob::MatchOptions;

use crate::error::PathSpecError;

/// Largest number of paths a single range expression may produce.
pub const MAX_RANGE_LEN: u64 = 10_000;

/// Expand a path specification into the ordered list of concrete paths it
/// names.
///
/// Rules are tried in order: literal, glob, bracket list/range. A glob that
/// matches nothing yields an empty list. Glob results are sorted so repeated
/// runs produce the same order.
///
/// # Errors
///
/// Returns [`PathSpecError`] for unbalanced or malformed brackets, a range
/// whose upper bound does not exceed its lower bound, a specification that
/// mixes `*` with bracket syntax, or an invalid glob pattern.
pub fn expand(spec: &str) -> Result<Vec<String>, PathSpecError> {
    let has_open = spec.contains('[');
    let has_close = spec.contains(']');

    if !spec.contains('*') && !has_open && !has_close {
        return Ok(vec![spec.to_string()]);
    }
    if spec.contains('*') {
        if has_open || has_close {
            return Err(malformed(
                spec,
                "glob wildcards cannot be combined with list or range expressions",
            ));
        }
        return glob_paths(spec);
    }
    if !(has_open && has_close) {
        return Err(PathSpecError::Unbalanced {
            spec: spec.to_string(),
        });
    }
    expand_brackets(spec)
}

/// Expand every specification in `specs`, resolving each against `base`
/// first, and flatten the results in declaration order.
///
/// # Errors
///
/// Returns the first [`PathSpecError`] encountered.
pub fn expand_all<S: AsRef<str>>(specs: &[S], base: &Path) -> Result<Vec<String>, PathSpecError> {
    let mut out = Vec::new();
    for spec in specs {
        let resolved = crate::paths::resolve(spec.as_ref(), base);
        out.extend(expand(&resolved.to_string_lossy())?);
    }
    Ok(out)
}

fn glob_paths(spec: &str) -> Result<Vec<String>, PathSpecError> {
    let recursive = spec.contains("**");
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob::glob_with(spec, options).map_err(|e| PathSpecError::Glob {
        spec: spec.to_string(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PathSpecError::Glob {
            spec: spec.to_string(),
            message: e.to_string(),
        })?;
        if recursive && !path.is_file() {
            continue;
        }
        paths.push(path.to_string_lossy().into_owned());
    }
    paths.sort();
    Ok(paths)
}

/// Expand the single `[...]` expression in `spec`.
fn expand_brackets(spec: &str) -> Result<Vec<String>, PathSpecError> {
    let Some((prefix, rest)) = spec.split_once('[') else {
        return Err(PathSpecError::Unbalanced {
            spec: spec.to_string(),
        });
    };
    let Some((inner, suffix)) = rest.split_once(']') else {
        return Err(PathSpecError::Unbalanced {
            spec: spec.to_string(),
        });
    };
    if prefix.contains(']') || inner.contains('[') {
        return Err(PathSpecError::Unbalanced {
            spec: spec.to_string(),
        });
    }
    if suffix.contains('[') || suffix.contains(']') {
        return Err(malformed(
            spec,
            "only one list or range expression is supported",
        ));
    }

    if inner.contains(',') {
        return Ok(inner
            .split(',')
            .filter(|part| !part.is_empty())
            .map(|part| format!("{prefix}{part}{suffix}"))
            .collect());
    }

    if let Some((low, high)) = inner.split_once('-') {
        let (low, high) = match (parse_bound(low), parse_bound(high)) {
            (Some(low), Some(high)) => (low, high),
            _ => {
                return Err(malformed(
                    spec,
                    "does not contain a valid range expression",
                ));
            }
        };
        if high <= low {
            return Err(PathSpecError::Range {
                spec: spec.to_string(),
                low,
                high,
            });
        }
        if high - low >= MAX_RANGE_LEN {
            return Err(malformed(
                spec,
                &format!("range expression exceeds {MAX_RANGE_LEN} paths"),
            ));
        }
        return Ok((low..=high)
            .map(|i| format!("{prefix}{i}{suffix}"))
            .collect());
    }

    Err(malformed(
        spec,
        "does not specify a range or list expression",
    ))
}

fn parse_bound(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn malformed(spec: &str, reason: &str) -> PathSpecError {
    PathSpecError::Malformed {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Literal
    // -----------------------------------------------------------------------

    #[test]
    fn literal_spec_is_returned_unchanged() {
        for spec in ["/foo/bar.txt", "foo.txt", "a b/c-d.e", ""] {
            assert_eq!(expand(spec).unwrap(), vec![spec.to_string()]);
        }
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    #[test]
    fn list_expands_in_declared_order() {
        assert_eq!(
            expand("/foo/bar-[a,b,c].txt").unwrap(),
            vec!["/foo/bar-a.txt", "/foo/bar-b.txt", "/foo/bar-c.txt"]
        );
    }

    #[test]
    fn list_skips_empty_parts() {
        assert_eq!(
            expand("foo-[a,,b,].txt").unwrap(),
            vec!["foo-a.txt", "foo-b.txt"]
        );
    }

    #[test]
    fn list_may_contain_path_segments() {
        assert_eq!(
            expand("conf/[nginx/site,apache/vhost].conf").unwrap(),
            vec!["conf/nginx/site.conf", "conf/apache/vhost.conf"]
        );
    }

    // -----------------------------------------------------------------------
    // Ranges
    // -----------------------------------------------------------------------

    #[test]
    fn range_expands_inclusive_ascending() {
        assert_eq!(
            expand("/foo/bar-[1-3].txt").unwrap(),
            vec!["/foo/bar-1.txt", "/foo/bar-2.txt", "/foo/bar-3.txt"]
        );
    }

    #[test]
    fn range_yields_high_minus_low_plus_one_paths() {
        let paths = expand("node[10-25].yaml").unwrap();
        assert_eq!(paths.len(), 16);
        assert_eq!(paths.first().unwrap(), "node10.yaml");
        assert_eq!(paths.last().unwrap(), "node25.yaml");
    }

    #[test]
    fn range_rejects_equal_bounds() {
        assert!(matches!(
            expand("foo[3-3].txt"),
            Err(PathSpecError::Range { low: 3, high: 3, .. })
        ));
    }

    #[test]
    fn range_rejects_descending_bounds() {
        assert!(matches!(
            expand("foo[5-1].txt"),
            Err(PathSpecError::Range { .. })
        ));
    }

    #[test]
    fn range_rejects_oversized_expansion() {
        assert!(matches!(
            expand("foo[0-99999999999].txt"),
            Err(PathSpecError::Malformed { .. })
        ));
        assert_eq!(expand("foo[1-10000].txt").unwrap().len(), 10_000);
    }

    #[test]
    fn range_rejects_non_numeric_bounds() {
        assert!(matches!(
            expand("foo[a-c].txt"),
            Err(PathSpecError::Malformed { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Malformed
    // -----------------------------------------------------------------------

    #[test]
    fn unbalanced_brackets_are_rejected() {
        for spec in ["foo[a,b.txt", "fooa,b].txt", "foo]a,b[.txt"] {
            assert!(
                matches!(expand(spec), Err(PathSpecError::Unbalanced { .. })),
                "{spec} should be unbalanced"
            );
        }
    }

    #[test]
    fn bracket_without_list_or_range_is_rejected() {
        assert!(matches!(
            expand("foo[abc].txt"),
            Err(PathSpecError::Malformed { .. })
        ));
    }

    #[test]
    fn multiple_expressions_are_rejected() {
        assert!(matches!(
            expand("foo[a,b]-[1-2].txt"),
            Err(PathSpecError::Malformed { .. })
        ));
    }

    #[test]
    fn glob_mixed_with_brackets_is_rejected() {
        assert!(matches!(
            expand("/tmp/*-[a,b].txt"),
            Err(PathSpecError::Malformed { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Globs
    // -----------------------------------------------------------------------

    #[test]
    fn glob_matches_single_level() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("c.md"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/d.txt"), "").unwrap();

        let spec = format!("{}/*.txt", dir.path().display());
        let paths = expand(&spec).unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("a.txt").to_string_lossy().into_owned(),
                dir.path().join("b.txt").to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn glob_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("conf.d")).unwrap();
        std::fs::write(dir.path().join("conf.d/a.conf"), "").unwrap();
        std::fs::write(dir.path().join("conf.d/.a.conf.swp"), "").unwrap();

        let paths = expand(&format!("{}/conf.d/*", dir.path().display())).unwrap();
        assert_eq!(
            paths,
            vec![dir.path().join("conf.d/a.conf").to_string_lossy().into_owned()]
        );

        let hidden = expand(&format!("{}/conf.d/.*", dir.path().display())).unwrap();
        assert_eq!(hidden.len(), 1);
    }

    #[test]
    fn recursive_glob_returns_only_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("top.conf"), "").unwrap();
        std::fs::write(dir.path().join("x/y/deep.conf"), "").unwrap();

        let spec = format!("{}/**/*", dir.path().display());
        let paths = expand(&spec).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| Path::new(p).is_file()));
    }

    #[test]
    fn glob_without_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let spec = format!("{}/*.nothing", dir.path().display());
        assert!(expand(&spec).unwrap().is_empty());
    }

    #[test]
    fn expand_all_resolves_against_base() {
        let paths = expand_all(&["foo.py", "bar[1-2].py"], Path::new("/tmp")).unwrap();
        assert_eq!(paths, vec!["/tmp/foo.py", "/tmp/bar1.py", "/tmp/bar2.py"]);
    }
}
