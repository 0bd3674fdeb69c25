//! Configuration documents: loading, merging, validation, and selection.
pub mod document;
pub mod files;
pub mod loader;
pub mod merge;
pub mod select;
pub mod validation;

pub use document::ConfigDocument;
pub use files::FileSpec;
pub use loader::load;
pub use validation::validate;
