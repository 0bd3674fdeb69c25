//! The merged configuration document.
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use super::files::FileSpec;
use crate::error::{LibraryError, MappingError};
use crate::pathspec;

/// Context key holding the canonical path of the root document.
pub const CONFIG_FILE_KEY: &str = "template_configuration_file";

/// An immutable, fully-merged configuration document.
///
/// `include` has already been consumed by the loader; everything else is
/// kept verbatim and doubles as the render context.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    data: Mapping,
    source: PathBuf,
}

impl ConfigDocument {
    /// Wrap merged `data` loaded from `source`.
    #[must_use]
    pub const fn new(data: Mapping, source: PathBuf) -> Self {
        Self { data, source }
    }

    /// Canonical path of the root document.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory containing the root document.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// The merged top-level mapping.
    #[must_use]
    pub const fn data(&self) -> &Mapping {
        &self.data
    }

    /// Look up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Raw `files` declarations, in declaration order.
    #[must_use]
    pub fn file_values(&self) -> &[Value] {
        self.get("files")
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Decode every `files` declaration into a [`FileSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Invalid`] naming the declaration that could not
    /// be decoded.
    pub fn file_specs(&self) -> Result<Vec<FileSpec>, MappingError> {
        self.file_values().iter().map(FileSpec::from_value).collect()
    }

    /// Resolve the `lib` path specifications to library files.
    ///
    /// Entries are resolved relative to the root document's directory. Every
    /// resolved path must be an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] if a specification is malformed or resolves
    /// to a path that is not a file.
    pub fn lib_paths(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let specs: Vec<&str> = self
            .get("lib")
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut paths = Vec::new();
        for path in pathspec::expand_all(&specs, self.source_dir())? {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(LibraryError::NotFound(path));
            }
            paths.push(path);
        }
        Ok(paths)
    }

    /// The document as a render context: the merged data plus
    /// `template_configuration_file`.
    #[must_use]
    pub fn context(&self) -> Mapping {
        let mut ctx = self.data.clone();
        ctx.insert(
            Value::from(CONFIG_FILE_KEY),
            Value::from(self.source.to_string_lossy().into_owned()),
        );
        ctx
    }

    /// Serialize the merged data as YAML for debug dumps.
    #[must_use]
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.data).unwrap_or_default()
    }
}
