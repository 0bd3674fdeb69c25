//! Declarative template renderer.
//!
//! A YAML configuration document declares a set of files; each is rendered
//! (or copied) into a private working directory, mirrored onto an output
//! directory, and finished with permissions, ownership, and symlinks.
//!
//! The public API is organised into these layers:
//!
//! - **[`pathspec`]**: expand compact path patterns (globs, lists, ranges)
//! - **[`config`]**: load, include, merge, and validate configuration documents
//! - **[`mapping`]**: turn file declarations into source/working/output paths
//! - **[`render`]**: the template engine and the staging of working files
//! - **[`sync`]**: mirror the working directory and apply file metadata
//! - **[`commands`]**: pipeline orchestration for file-set and stdin modes
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod host;
pub mod logging;
pub mod mapping;
pub mod paths;
pub mod pathspec;
pub mod render;
pub mod resources;
pub mod sync;
