//! Stage every mapped file into the working directory.
//!
//! Translated files are rendered with the merged configuration as context,
//! plus two per-file keys:
//!
//! - `file`: basename of the destination
//! - `this`: the `files` declaration that produced the mapping
//!
//! Everything else is copied byte-for-byte. Mappings are processed in order,
//! so with fan-in the last source written to a working path wins.
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use minijinja::Value;
use minijinja::value::{Enumerator, Object};

use super::engine::Engine;
use crate::config::ConfigDocument;
use crate::config::files::spec_key;
use crate::error::RenderError;
use crate::logging::Log;
use crate::mapping::PathMapping;

/// Counts of staged files, for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageSummary {
    /// Files rendered through the engine.
    pub rendered: usize,
    /// Files copied verbatim.
    pub copied: usize,
}

/// Read-only view of the base context with a few keys layered on top.
///
/// Lookups hit the overlay first and fall through to the shared base, so the
/// merged configuration is never cloned or mutated per file.
#[derive(Debug)]
struct ContextOverlay {
    base: Value,
    file: Value,
    this: Value,
}

impl ContextOverlay {
    const KEYS: [&'static str; 2] = ["file", "this"];
}

impl Object for ContextOverlay {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str() {
            Some("file") => Some(self.file.clone()),
            Some("this") => Some(self.this.clone()),
            _ => self
                .base
                .get_item(key)
                .ok()
                .filter(|v| !v.is_undefined()),
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let mut keys: Vec<Value> = Self::KEYS.iter().map(|k| Value::from(*k)).collect();
        if let Ok(iter) = self.base.try_iter() {
            keys.extend(iter.filter(|k| !k.as_str().is_some_and(|s| Self::KEYS.contains(&s))));
        }
        Enumerator::Values(keys)
    }
}

/// Render or copy every mapping into its working path.
///
/// # Errors
///
/// Returns the first [`RenderError`]; files staged before it stay in the
/// working directory.
pub fn stage_all(
    engine: &Engine,
    doc: &ConfigDocument,
    mapping: &[PathMapping],
    log: &dyn Log,
) -> Result<StageSummary, RenderError> {
    log.stage("Translating templates...");
    let base = Value::from_serialize(doc.context());
    let declarations = doc.file_values();

    let mut summary = StageSummary::default();
    let mut written: HashSet<&Path> = HashSet::new();
    let mut current_spec: Option<&str> = None;

    for m in mapping {
        if current_spec != Some(m.spec_key.as_str()) {
            log.substep(&m.spec_key);
            current_spec = Some(m.spec_key.as_str());
        }
        if !written.insert(&m.work_path) {
            log.debug(&format!(
                "\"{}\" is written more than once; \"{}\" replaces the earlier source",
                m.rel_dst.display(),
                m.src_path.display()
            ));
        }

        if m.translate {
            log.info(&format!(
                "Translating \"{}\" into \"{}\"...",
                m.src_path.display(),
                m.work_path.display()
            ));
            let this = declarations
                .iter()
                .find(|d| spec_key(d) == m.spec_key)
                .map(Value::from_serialize)
                .unwrap_or_default();
            let ctx = Value::from_object(ContextOverlay {
                base: base.clone(),
                file: Value::from(file_basename(&m.rel_dst)),
                this,
            });
            let rendered = engine.render_template(&template_name(&m.rel_src), &ctx)?;
            ensure_parent(m)?;
            std::fs::write(&m.work_path, rendered)
                .map_err(|source| fs_error(m, "writing rendered output", source))?;
            summary.rendered += 1;
        } else {
            log.info(&format!(
                "Copying \"{}\" to \"{}\"...",
                m.src_path.display(),
                m.work_path.display()
            ));
            ensure_parent(m)?;
            std::fs::copy(&m.src_path, &m.work_path)
                .map_err(|source| fs_error(m, "copying source file", source))?;
            summary.copied += 1;
        }
    }

    Ok(summary)
}

/// Template names use `/` regardless of platform.
fn template_name(rel_src: &Path) -> String {
    rel_src
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn ensure_parent(m: &PathMapping) -> Result<(), RenderError> {
    let Some(parent) = m.work_path.parent() else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|source| {
        fs_error(
            m,
            &format!("unable to create parent directory \"{}\"", parent.display()),
            source,
        )
    })
}

fn fs_error(m: &PathMapping, action: &str, source: std::io::Error) -> RenderError {
    RenderError::Filesystem {
        target: m.rel_dst.display().to_string(),
        action: action.to_string(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::host::HostInfo;
    use crate::logging::testing::RecordingLog;
    use crate::mapping::{MappingRoots, compute_mapping};
    use crate::render::EngineSettings;

    struct Fixture {
        _dir: tempfile::TempDir,
        roots: MappingRoots,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let base = dunce::canonicalize(dir.path()).unwrap();
            let roots = MappingRoots {
                template: base.join("src"),
                output: base.join("out"),
                working: base.join("wrk"),
            };
            std::fs::create_dir_all(&roots.template).unwrap();
            std::fs::create_dir_all(&roots.working).unwrap();
            Self { _dir: dir, roots }
        }

        fn template(&self, rel: &str, content: &str) {
            let path = self.roots.template.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn doc(&self, yaml: &str) -> ConfigDocument {
            ConfigDocument::new(
                serde_yaml::from_str(yaml).unwrap(),
                self.roots.template.join("tmpl.yaml"),
            )
        }

        fn engine(&self) -> Engine {
            Engine::new(
                &self.roots.template,
                &self.roots.output,
                &HostInfo::new("web01", "web01.example.com"),
                &EngineSettings::default(),
            )
            .unwrap()
        }

        fn run(&self, doc: &ConfigDocument) -> Result<StageSummary, RenderError> {
            let mapping = compute_mapping(doc, &self.roots).unwrap();
            stage_all(&self.engine(), doc, &mapping, &RecordingLog::default())
        }

        fn staged(&self, rel: &str) -> String {
            std::fs::read_to_string(self.roots.working.join(rel)).unwrap()
        }
    }

    #[test]
    fn renders_with_file_and_this() {
        let fx = Fixture::new();
        fx.template(
            "etc/motd",
            "{{ file }} on {{ hostname }}: {{ greeting }} ({{ this.owner }})\n",
        );
        let doc = fx.doc("greeting: hi\nfiles:\n  - dst: etc/motd\n    owner: ops\n");

        let summary = fx.run(&doc).unwrap();
        assert_eq!(summary, StageSummary { rendered: 1, copied: 0 });
        assert_eq!(fx.staged("etc/motd"), "motd on web01: hi (ops)");
    }

    #[test]
    fn this_refers_to_the_owning_declaration() {
        let fx = Fixture::new();
        fx.template("a.j2", "{{ this.dst }}");
        fx.template("b.j2", "{{ this.dst }}");
        let doc = fx.doc(
            "files:\n  - {src: a.j2, dst: first.txt}\n  - {src: b.j2, dst: second.txt}\n",
        );

        fx.run(&doc).unwrap();
        assert_eq!(fx.staged("first.txt"), "first.txt");
        assert_eq!(fx.staged("second.txt"), "second.txt");
    }

    #[test]
    fn config_file_key_is_in_context() {
        let fx = Fixture::new();
        fx.template("where", "{{ template_configuration_file }}");
        let doc = fx.doc("files: [{dst: where}]");

        fx.run(&doc).unwrap();
        assert_eq!(
            fx.staged("where"),
            fx.roots.template.join("tmpl.yaml").display().to_string()
        );
    }

    #[test]
    fn untranslated_files_are_copied_verbatim() {
        let fx = Fixture::new();
        fx.template("raw/{{literal}}.txt", "{{ not rendered }}\n");
        let doc = fx.doc("files:\n  - {dst: 'raw/{{literal}}.txt', translate: false}\n");

        let summary = fx.run(&doc).unwrap();
        assert_eq!(summary, StageSummary { rendered: 0, copied: 1 });
        assert_eq!(fx.staged("raw/{{literal}}.txt"), "{{ not rendered }}\n");
    }

    #[test]
    fn fan_in_last_source_wins() {
        let fx = Fixture::new();
        fx.template("parts/1.conf", "one");
        fx.template("parts/2.conf", "two");
        let doc = fx.doc("files:\n  - {src: 'parts/[1,2].conf', dst: merged.conf}\n");

        fx.run(&doc).unwrap();
        assert_eq!(fx.staged("merged.conf"), "two");
    }

    #[test]
    fn render_failure_names_template() {
        let fx = Fixture::new();
        fx.template("broken.j2", "{% for %}");
        let doc = fx.doc("files: [{src: broken.j2, dst: out.txt}]");

        match fx.run(&doc).unwrap_err() {
            RenderError::TemplateSyntax { template, .. } => assert_eq!(template, "broken.j2"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
