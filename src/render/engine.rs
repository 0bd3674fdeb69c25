//! The [`minijinja`] environment shared by every render in a run.
use std::path::{Path, PathBuf};

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, ErrorKind, Value};

use super::functions::{self, FunctionRoots};
use crate::error::{EngineError, RenderError, StdinError};
use crate::host::HostInfo;

/// Delimiter and whitespace settings for the template language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Opens a block tag (`{%`).
    pub block_start: String,
    /// Closes a block tag (`%}`).
    pub block_end: String,
    /// Opens a variable tag (`{{`).
    pub variable_start: String,
    /// Closes a variable tag (`}}`).
    pub variable_end: String,
    /// Opens a comment (`{#`).
    pub comment_start: String,
    /// Closes a comment (`#}`).
    pub comment_end: String,
    /// Drop the first newline after a block tag.
    pub trim_blocks: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            block_start: "{%".to_string(),
            block_end: "%}".to_string(),
            variable_start: "{{".to_string(),
            variable_end: "}}".to_string(),
            comment_start: "{#".to_string(),
            comment_end: "#}".to_string(),
            trim_blocks: true,
        }
    }
}

/// Template engine rooted at the template directory.
///
/// Templates are looked up by their path relative to the root, so the
/// `rel_src` of a [`PathMapping`](crate::mapping::PathMapping) is its template
/// name. Library modules imported with
/// [`load_library`](Self::load_library) share the same environment.
#[derive(Debug)]
pub struct Engine {
    pub(super) env: Environment<'static>,
    root: PathBuf,
}

impl Engine {
    /// Build an engine for `template_root`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingRoot`] if the root is not a directory and
    /// [`EngineError::Syntax`] if the delimiters are rejected.
    pub fn new(
        template_root: &Path,
        output_root: &Path,
        host: &HostInfo,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        if !template_root.is_dir() {
            return Err(EngineError::MissingRoot(template_root.to_path_buf()));
        }

        let mut env = Environment::new();
        let syntax = SyntaxConfig::builder()
            .block_delimiters(settings.block_start.clone(), settings.block_end.clone())
            .variable_delimiters(
                settings.variable_start.clone(),
                settings.variable_end.clone(),
            )
            .comment_delimiters(settings.comment_start.clone(), settings.comment_end.clone())
            .build()
            .map_err(|e| EngineError::Syntax(describe(&e)))?;
        env.set_syntax(syntax);
        env.set_trim_blocks(settings.trim_blocks);

        let root = template_root.to_path_buf();
        let loader_root = root.clone();
        env.set_loader(move |name| {
            match std::fs::read_to_string(loader_root.join(name)) {
                Ok(source) => Ok(Some(source)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template \"{name}\""),
                )
                .with_source(e)),
            }
        });

        env.add_global("hostname", host.hostname.clone());
        env.add_global("fqdn", host.fqdn.clone());
        env.add_global(
            "output_directory",
            output_root.to_string_lossy().into_owned(),
        );
        functions::register(
            &mut env,
            &FunctionRoots {
                template: root.clone(),
            },
        );

        Ok(Self { env, root })
    }

    /// Directory templates are loaded from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render the template named `name` (relative to the root).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TemplateSyntax`] if the template does not
    /// compile and [`RenderError::TemplateRender`] if evaluation fails.
    pub fn render_template(&self, name: &str, ctx: &Value) -> Result<String, RenderError> {
        self.env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|e| render_error(name, &e))
    }

    /// Render an ad-hoc template source, such as standard input.
    ///
    /// # Errors
    ///
    /// Returns [`StdinError::Render`] if the source fails to compile or render.
    pub fn render_source(&self, source: &str, ctx: &Value) -> Result<String, StdinError> {
        self.env
            .render_str(source, ctx)
            .map_err(|e| StdinError::Render {
                line: e.line(),
                message: describe(&e),
            })
    }
}

/// Render an engine error as a single line, including any chained cause.
pub(super) fn describe(err: &minijinja::Error) -> String {
    let mut message = err
        .detail()
        .map_or_else(|| err.kind().to_string(), ToString::to_string);
    if let Some(source) = std::error::Error::source(err) {
        message = format!("{message}: {source}");
    }
    message
}

fn render_error(name: &str, err: &minijinja::Error) -> RenderError {
    let template = err.name().unwrap_or(name).to_string();
    if err.kind() == ErrorKind::SyntaxError {
        RenderError::TemplateSyntax {
            template,
            line: err.line(),
            message: describe(err),
        }
    } else {
        RenderError::TemplateRender {
            template,
            line: err.line(),
            message: describe(err),
        }
    }
}
