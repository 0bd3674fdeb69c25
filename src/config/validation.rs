//! Structural validation of the merged configuration document.
use serde_yaml::Value;

use super::document::ConfigDocument;
use super::files::spec_key;
use crate::error::ValidationError;

/// Check the structural rules of a merged document, failing on the first
/// violation.
///
/// - `files`, when present, is a list of mappings, each with a string `dst`
/// - `src` and `symlink` are strings, `translate` is a boolean, and
///   `chmod`/`chown` are strings or numbers
/// - `lib`, when present, is a list of strings
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(doc: &ConfigDocument) -> Result<(), ValidationError> {
    if let Some(files) = doc.get("files") {
        let Value::Sequence(entries) = files else {
            return Err(ValidationError::FilesNotMappings);
        };
        if entries.iter().any(|e| !e.is_mapping()) {
            return Err(ValidationError::FilesNotMappings);
        }
        if entries.iter().any(|e| e.get("dst").is_none()) {
            return Err(ValidationError::MissingDst);
        }
        for entry in entries {
            validate_file_entry(entry)?;
        }
    }

    if let Some(lib) = doc.get("lib") {
        let Value::Sequence(entries) = lib else {
            return Err(ValidationError::LibNotStrings);
        };
        if entries.iter().any(|e| !e.is_string()) {
            return Err(ValidationError::LibNotStrings);
        }
    }

    Ok(())
}

fn validate_file_entry(entry: &Value) -> Result<(), ValidationError> {
    let field_type = |field: &'static str, expected: &'static str| ValidationError::FieldType {
        dst: spec_key(entry).to_string(),
        field,
        expected,
    };

    for field in ["dst", "src", "symlink"] {
        if entry.get(field).is_some_and(|v| !v.is_string()) {
            return Err(field_type(field, "a path specification string"));
        }
    }
    if entry.get("translate").is_some_and(|v| !v.is_bool()) {
        return Err(field_type("translate", "a boolean"));
    }
    for field in ["chmod", "chown"] {
        if entry
            .get(field)
            .is_some_and(|v| !(v.is_string() || v.is_number()))
        {
            return Err(field_type(field, "a string or number"));
        }
    }
    Ok(())
}
