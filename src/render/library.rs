//! Extension libraries: template modules whose exports become globals.
//!
//! ```jinja
//! {% macro vhost(name, port=80) %}server { listen {{ port }}; server_name {{ name }}; }{% endmacro %}
//! {% set admin_email = "ops@example.com" %}
//! ```
//!
//! After [`Engine::load_library`], every template can call `vhost(...)` and
//! read `admin_email` without importing anything.
use std::path::Path;

use minijinja::value::{Rest, ValueKind};
use minijinja::{Error, ErrorKind, State, Value, context};

use super::engine::{Engine, describe};
use crate::error::LibraryError;

/// A top-level name exported by a library module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryExport {
    /// Name the export is registered under.
    pub name: String,
    /// `true` for macros, `false` for plain values.
    pub callable: bool,
}

impl Engine {
    /// Import the library module at `path` and register its exports as
    /// globals. A name already registered by an earlier library is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Io`] if the file cannot be read and
    /// [`LibraryError::Load`] if it does not compile or evaluate.
    pub fn load_library(&mut self, path: &Path) -> Result<Vec<LibraryExport>, LibraryError> {
        let source = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let load_error = |e: &Error| LibraryError::Load {
            path: path.to_path_buf(),
            message: describe(e),
        };

        let id = library_id(path);
        self.env
            .add_template_owned(id.clone(), source)
            .map_err(|e| load_error(&e))?;

        let values: Vec<(String, Value)> = {
            let tmpl = self.env.get_template(&id).map_err(|e| load_error(&e))?;
            let state = tmpl.eval_to_state(context! {}).map_err(|e| load_error(&e))?;
            state
                .exports()
                .into_iter()
                .map(|name| (name.to_string(), state.lookup(name).unwrap_or_default()))
                .collect()
        };

        let mut exports = Vec::with_capacity(values.len());
        for (name, value) in values {
            let callable = is_macro(&name, &value);
            if callable {
                self.env
                    .add_function(name.clone(), macro_trampoline(id.clone(), name.clone()));
            } else {
                self.env.add_global(name.clone(), value);
            }
            exports.push(LibraryExport { name, callable });
        }
        Ok(exports)
    }
}

/// Macros surface as map-like objects carrying their own `name`, their
/// `arguments` list and a `caller` flag.
fn is_macro(name: &str, value: &Value) -> bool {
    value.kind() == ValueKind::Map
        && value
            .get_attr("name")
            .is_ok_and(|n| n.as_str() == Some(name))
        && value
            .get_attr("arguments")
            .is_ok_and(|a| a.kind() == ValueKind::Seq)
        && value
            .get_attr("caller")
            .is_ok_and(|c| c.kind() == ValueKind::Bool)
}

fn library_id(path: &Path) -> String {
    format!("@lib:{}", path.display())
}

/// A macro only runs inside the module state that defined it, so each call
/// re-evaluates the library and invokes the freshly bound macro.
fn macro_trampoline(
    id: String,
    name: String,
) -> impl Fn(&State, Rest<Value>) -> Result<Value, Error> + Send + Sync + 'static {
    move |state: &State, args: Rest<Value>| {
        let tmpl = state.env().get_template(&id)?;
        let module = tmpl.eval_to_state(context! {})?;
        let callable = module.lookup(&name).ok_or_else(|| {
            Error::new(
                ErrorKind::UnknownFunction,
                format!("library macro \"{name}\" is no longer defined"),
            )
        })?;
        callable.call(&module, &args)
    }
}
