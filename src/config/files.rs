//! Typed `files` declarations.
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_yaml::Value;

use crate::error::MappingError;

/// One element of the `files` list.
///
/// ```yaml
/// files:
///   - dst: etc/motd            # rendered from <templates>/etc/motd
///   - src: nginx/site.conf.j2
///     dst: etc/nginx/sites-enabled/default
///     chmod: 644
///     chown: root:root
///     symlink: etc/nginx/default.conf
///   - dst: bin/[backup,restore].sh
///     translate: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSpec {
    /// Destination path specification (relative to the output directory).
    pub dst: String,
    /// Source path specification (relative to the template directory).
    #[serde(default)]
    pub src: Option<String>,
    /// Render through the template engine (`true`) or copy verbatim.
    #[serde(default = "default_true")]
    pub translate: bool,
    /// Arguments for `chmod`; empty means leave permissions alone.
    #[serde(default, deserialize_with = "string_or_number")]
    pub chmod: String,
    /// Arguments for `chown`; empty means leave ownership alone.
    #[serde(default, deserialize_with = "string_or_number")]
    pub chown: String,
    /// Symlink location (relative to the output directory).
    #[serde(default)]
    pub symlink: Option<String>,
}

impl FileSpec {
    /// Decode a raw declaration.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Invalid`] when a field has the wrong type or
    /// `dst` is missing.
    pub fn from_value(value: &Value) -> Result<Self, MappingError> {
        serde_yaml::from_value(value.clone()).map_err(|e| MappingError::Invalid {
            dst: spec_key(value).to_string(),
            message: e.to_string(),
        })
    }
}

/// The unexpanded `dst` of a raw declaration, or `<unknown>`.
#[must_use]
pub fn spec_key(value: &Value) -> &str {
    value
        .get("dst")
        .and_then(Value::as_str)
        .unwrap_or("<unknown>")
}

const fn default_true() -> bool {
    true
}

/// Accept `chmod: 600` as well as `chmod: "u+x"`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(D::Error::custom("expected a string or a number")),
    }
}
