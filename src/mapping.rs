//! Source, working, and output path correspondence.
//!
//! Every `files` declaration expands to one [`PathMapping`] per concrete
//! source file:
//!
//! ```text
//! {dst: "foo-[a,b].txt"}            (template root /tmp/src, output /tmp/dst)
//!   /tmp/src/foo-a.txt -> /tmp/wrk/foo-a.txt -> /tmp/dst/foo-a.txt
//!   /tmp/src/foo-b.txt -> /tmp/wrk/foo-b.txt -> /tmp/dst/foo-b.txt
//!
//! {src: "conf.d/*.conf", dst: "app.conf"}
//!   /tmp/src/conf.d/a.conf -> /tmp/wrk/app.conf -> /tmp/dst/app.conf
//!   /tmp/src/conf.d/b.conf -> /tmp/wrk/app.conf -> /tmp/dst/app.conf
//! ```
//!
//! Without `src`, the expanded source paths are mirrored 1:1 into the output
//! tree. With `src`, `dst` must name exactly one path; several sources
//! sharing that destination is allowed and the last one written wins.
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{ConfigDocument, FileSpec};
use crate::error::{MappingError, PathSpecError};
use crate::paths;
use crate::pathspec;

/// The three directory roots a mapping is computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRoots {
    /// Directory templates are loaded from.
    pub template: PathBuf,
    /// Final output directory.
    pub output: PathBuf,
    /// Private staging directory mirrored onto `output`.
    pub working: PathBuf,
}

/// One resolved unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMapping {
    /// Absolute path of the source/template file.
    pub src_path: PathBuf,
    /// Absolute path of the final output file.
    pub dst_path: PathBuf,
    /// Absolute staging path under the working root.
    pub work_path: PathBuf,
    /// Absolute symlink location pointing at `dst_path`, if any.
    pub link_path: Option<PathBuf>,
    /// `src_path` relative to the template root; the template identifier.
    pub rel_src: PathBuf,
    /// `dst_path` relative to the output root.
    pub rel_dst: PathBuf,
    /// `link_path` relative to the output root.
    pub rel_link: Option<PathBuf>,
    /// Render (`true`) or copy verbatim.
    pub translate: bool,
    /// `chmod` arguments; empty for none.
    pub chmod: String,
    /// `chown` arguments; empty for none.
    pub chown: String,
    /// The unexpanded `dst` of the owning declaration.
    pub spec_key: String,
}

/// Compute the mapping for every `files` declaration of `doc`.
///
/// # Errors
///
/// Returns [`MappingError`] identifying the first declaration that cannot be
/// decoded or mapped.
pub fn compute_mapping(
    doc: &ConfigDocument,
    roots: &MappingRoots,
) -> Result<Vec<PathMapping>, MappingError> {
    let specs = doc.file_specs()?;
    compute(&specs, roots)
}

/// Compute the mapping for `specs`, in declaration order.
///
/// # Errors
///
/// Returns [`MappingError`] identifying the first declaration that cannot be
/// mapped.
pub fn compute(specs: &[FileSpec], roots: &MappingRoots) -> Result<Vec<PathMapping>, MappingError> {
    let mut mapping = Vec::new();
    for spec in specs {
        if let Some(src) = &spec.src {
            map_with_src(spec, src, roots, &mut mapping)?;
        } else {
            map_bare_dst(spec, roots, &mut mapping)?;
        }
    }
    Ok(mapping)
}

/// `{src, dst}`: many sources may converge on the single destination.
fn map_with_src(
    spec: &FileSpec,
    src: &str,
    roots: &MappingRoots,
    out: &mut Vec<PathMapping>,
) -> Result<(), MappingError> {
    let srcs = expand_sources(spec, src, "src", &roots.template)?;

    let dsts = expand(&spec.dst, &roots.output)
        .map_err(|source| spec_error(spec, "destination", source))?;
    let dst_path = match dsts.as_slice() {
        [] => {
            return Err(MappingError::Empty {
                dst: spec.dst.clone(),
                role: "destination",
                field: "dst",
            });
        }
        [single] => single.clone(),
        many => {
            return Err(MappingError::AmbiguousDestination {
                dst: spec.dst.clone(),
                count: many.len(),
            });
        }
    };
    let rel_dst = output_relative(spec, &dst_path, &roots.output)?;

    let link = resolve_link(spec, srcs.len(), "src", &roots.output)?;

    for src_path in srcs {
        out.push(record(spec, src_path, dst_path.clone(), rel_dst.clone(), link.clone(), roots));
    }
    Ok(())
}

/// `{dst}`: the source tree is mirrored into the output tree.
fn map_bare_dst(
    spec: &FileSpec,
    roots: &MappingRoots,
    out: &mut Vec<PathMapping>,
) -> Result<(), MappingError> {
    let srcs = expand_sources(spec, &spec.dst, "dst", &roots.template)?;
    let link = resolve_link(spec, srcs.len(), "dst", &roots.output)?;

    for src_path in srcs {
        let rel = paths::relative_to(&src_path, &roots.template);
        let dst_path = paths::normalize(&roots.output.join(&rel));
        let rel_dst = output_relative(spec, &dst_path, &roots.output)?;
        out.push(record(spec, src_path, dst_path, rel_dst, link.clone(), roots));
    }
    Ok(())
}

fn record(
    spec: &FileSpec,
    src_path: PathBuf,
    dst_path: PathBuf,
    rel_dst: PathBuf,
    link: Option<(PathBuf, PathBuf)>,
    roots: &MappingRoots,
) -> PathMapping {
    let rel_src = paths::relative_to(&src_path, &roots.template);
    let work_path = roots.working.join(&rel_dst);
    let (link_path, rel_link) = link.map_or((None, None), |(abs, rel)| (Some(abs), Some(rel)));
    PathMapping {
        src_path,
        dst_path,
        work_path,
        link_path,
        rel_src,
        rel_dst,
        rel_link,
        translate: spec.translate,
        chmod: spec.chmod.clone(),
        chown: spec.chown.clone(),
        spec_key: spec.dst.clone(),
    }
}

/// Expand a source specification against the template root; every result
/// must be an existing file.
fn expand_sources(
    spec: &FileSpec,
    pattern: &str,
    field: &'static str,
    template: &Path,
) -> Result<Vec<PathBuf>, MappingError> {
    let srcs = expand(pattern, template).map_err(|source| spec_error(spec, "source", source))?;
    if srcs.is_empty() {
        return Err(MappingError::Empty {
            dst: spec.dst.clone(),
            role: "source",
            field,
        });
    }
    if let Some(missing) = srcs.iter().find(|p| !p.is_file()) {
        return Err(MappingError::MissingSource {
            dst: spec.dst.clone(),
            path: missing.clone(),
        });
    }
    Ok(srcs)
}

/// Resolve `symlink` to `(absolute, relative-to-output)`.
fn resolve_link(
    spec: &FileSpec,
    source_count: usize,
    source_field: &'static str,
    output: &Path,
) -> Result<Option<(PathBuf, PathBuf)>, MappingError> {
    let Some(symlink) = &spec.symlink else {
        return Ok(None);
    };
    if source_count > 1 {
        return Err(MappingError::SymlinkCardinality {
            dst: spec.dst.clone(),
            field: source_field,
        });
    }
    let links = expand(symlink, output).map_err(|source| spec_error(spec, "symlink", source))?;
    match links.as_slice() {
        [] => Err(MappingError::Empty {
            dst: spec.dst.clone(),
            role: "symlink",
            field: "symlink",
        }),
        [single] => Ok(Some((single.clone(), paths::relative_to(single, output)))),
        many => Err(MappingError::AmbiguousSymlink {
            dst: spec.dst.clone(),
            count: many.len(),
        }),
    }
}

fn output_relative(spec: &FileSpec, dst_path: &Path, output: &Path) -> Result<PathBuf, MappingError> {
    if !paths::is_within(dst_path, output) || paths::normalize(dst_path) == paths::normalize(output) {
        return Err(MappingError::OutsideOutput {
            dst: spec.dst.clone(),
            path: dst_path.to_path_buf(),
            root: output.to_path_buf(),
        });
    }
    Ok(paths::relative_to(dst_path, output))
}

fn expand(pattern: &str, base: &Path) -> Result<Vec<PathBuf>, PathSpecError> {
    let resolved = paths::resolve(pattern, base);
    Ok(pathspec::expand(&resolved.to_string_lossy())?
        .into_iter()
        .map(|p| paths::normalize(Path::new(&p)))
        .collect())
}

fn spec_error(spec: &FileSpec, role: &'static str, source: PathSpecError) -> MappingError {
    MappingError::Spec {
        dst: spec.dst.clone(),
        role,
        source,
    }
}

/// Render a mapping as YAML for debug dumps.
#[must_use]
pub fn to_yaml(mapping: &[PathMapping]) -> String {
    serde_yaml::to_string(mapping).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        roots: MappingRoots,
    }

    impl Fixture {
        fn new(templates: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let roots = MappingRoots {
                template: dir.path().join("src"),
                output: dir.path().join("dst"),
                working: dir.path().join("wrk"),
            };
            for t in templates {
                let p = roots.template.join(t);
                std::fs::create_dir_all(p.parent().unwrap()).unwrap();
                std::fs::write(&p, *t).unwrap();
            }
            Self { _dir: dir, roots }
        }

        fn compute(&self, yaml: &str) -> Result<Vec<PathMapping>, MappingError> {
            let specs: Vec<FileSpec> = serde_yaml::from_str(yaml).unwrap();
            compute(&specs, &self.roots)
        }

        fn summary(&self, mapping: &[PathMapping]) -> String {
            mapping
                .iter()
                .map(|m| format!("{} -> {}", m.rel_src.display(), m.rel_dst.display()))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    #[test]
    fn bare_dst_single_file() {
        let fx = Fixture::new(&["foo.txt"]);
        let mapping = fx.compute("[{dst: foo.txt}]").unwrap();
        let r = &fx.roots;
        assert_eq!(
            mapping,
            vec![PathMapping {
                src_path: r.template.join("foo.txt"),
                dst_path: r.output.join("foo.txt"),
                work_path: r.working.join("foo.txt"),
                link_path: None,
                rel_src: PathBuf::from("foo.txt"),
                rel_dst: PathBuf::from("foo.txt"),
                rel_link: None,
                translate: true,
                chmod: String::new(),
                chown: String::new(),
                spec_key: "foo.txt".to_string(),
            }]
        );
    }

    #[test]
    fn bare_dst_list_expansion() {
        let fx = Fixture::new(&["foo-a.txt", "foo-b.txt"]);
        let mapping = fx.compute("[{dst: 'foo-[a,b].txt'}]").unwrap();
        assert_eq!(mapping.len(), 2);
        for m in &mapping {
            assert_eq!(m.rel_src, m.rel_dst);
            assert_eq!(m.spec_key, "foo-[a,b].txt");
        }
        insta::assert_snapshot!(fx.summary(&mapping), @r"
        foo-a.txt -> foo-a.txt
        foo-b.txt -> foo-b.txt
        ");
    }

    #[test]
    fn bare_dst_glob_mirrors_tree_sorted() {
        let fx = Fixture::new(&["etc/b.conf", "etc/a.conf", "etc/sub/c.conf", "other.txt"]);
        let mapping = fx.compute("[{dst: 'etc/**/*.conf'}]").unwrap();
        insta::assert_snapshot!(fx.summary(&mapping), @r"
        etc/a.conf -> etc/a.conf
        etc/b.conf -> etc/b.conf
        etc/sub/c.conf -> etc/sub/c.conf
        ");
    }

    #[test]
    fn src_maps_to_single_destination() {
        let fx = Fixture::new(&["templates/site.conf.j2"]);
        let mapping = fx
            .compute("[{src: templates/site.conf.j2, dst: nginx/default, chmod: 644, translate: false}]")
            .unwrap();
        assert_eq!(mapping.len(), 1);
        let m = &mapping[0];
        assert_eq!(m.rel_src, PathBuf::from("templates/site.conf.j2"));
        assert_eq!(m.rel_dst, PathBuf::from("nginx/default"));
        assert_eq!(m.work_path, fx.roots.working.join("nginx/default"));
        assert_eq!(m.chmod, "644");
        assert!(!m.translate);
    }

    #[test]
    fn src_fan_in_shares_destination() {
        let fx = Fixture::new(&["parts/1.txt", "parts/2.txt"]);
        let mapping = fx.compute("[{src: 'parts/[1-2].txt', dst: all.txt}]").unwrap();
        assert_eq!(mapping.len(), 2);
        assert!(mapping.iter().all(|m| m.dst_path == fx.roots.output.join("all.txt")));
    }

    #[test]
    fn src_with_expanding_dst_is_rejected() {
        let fx = Fixture::new(&["a.txt"]);
        assert!(matches!(
            fx.compute("[{src: a.txt, dst: 'out-[a,b].txt'}]"),
            Err(MappingError::AmbiguousDestination { count: 2, .. })
        ));
    }

    #[test]
    fn symlink_with_many_sources_is_rejected() {
        let fx = Fixture::new(&["parts/1.txt", "parts/2.txt"]);
        assert!(matches!(
            fx.compute("[{src: 'parts/*.txt', dst: all.txt, symlink: link.txt}]"),
            Err(MappingError::SymlinkCardinality { field: "src", .. })
        ));
        assert!(matches!(
            fx.compute("[{dst: 'parts/*.txt', symlink: link.txt}]"),
            Err(MappingError::SymlinkCardinality { field: "dst", .. })
        ));
    }

    #[test]
    fn symlink_resolves_against_output() {
        let fx = Fixture::new(&["app.conf"]);
        let mapping = fx.compute("[{dst: app.conf, symlink: etc/app.conf}]").unwrap();
        assert_eq!(mapping[0].link_path, Some(fx.roots.output.join("etc/app.conf")));
        assert_eq!(mapping[0].rel_link, Some(PathBuf::from("etc/app.conf")));

        let mapping = fx
            .compute("[{src: app.conf, dst: app2.conf, symlink: /srv/app.conf}]")
            .unwrap();
        assert_eq!(mapping[0].link_path, Some(PathBuf::from("/srv/app.conf")));
    }

    #[test]
    fn missing_source_is_rejected() {
        let fx = Fixture::new(&["foo-a.txt"]);
        assert!(matches!(
            fx.compute("[{dst: 'foo-[a,b].txt'}]"),
            Err(MappingError::MissingSource { path, .. }) if path.ends_with("foo-b.txt")
        ));
    }

    #[test]
    fn glob_without_matches_is_rejected() {
        let fx = Fixture::new(&[]);
        assert!(matches!(
            fx.compute("[{dst: '*.txt'}]"),
            Err(MappingError::Empty { role: "source", field: "dst", .. })
        ));
    }

    #[test]
    fn malformed_spec_names_role() {
        let fx = Fixture::new(&["a.txt"]);
        assert!(matches!(
            fx.compute("[{src: a.txt, dst: 'b[3-1].txt'}]"),
            Err(MappingError::Spec { role: "destination", source: PathSpecError::Range { .. }, .. })
        ));
    }

    #[test]
    fn destination_outside_output_is_rejected() {
        let fx = Fixture::new(&["a.txt"]);
        assert!(matches!(
            fx.compute("[{src: a.txt, dst: ../escape.txt}]"),
            Err(MappingError::OutsideOutput { .. })
        ));
    }

    #[test]
    fn declaration_order_is_preserved() {
        let fx = Fixture::new(&["b.txt", "a.txt"]);
        let mapping = fx.compute("[{dst: b.txt}, {dst: a.txt}]").unwrap();
        insta::assert_snapshot!(fx.summary(&mapping), @r"
        b.txt -> b.txt
        a.txt -> a.txt
        ");
    }

    #[test]
    fn yaml_dump_lists_every_field() {
        let fx = Fixture::new(&["a.txt"]);
        let dump = to_yaml(&fx.compute("[{dst: a.txt}]").unwrap());
        for key in ["src_path", "dst_path", "work_path", "rel_src", "spec_key", "translate"] {
            assert!(dump.contains(key), "missing {key} in {dump}");
        }
    }
}
