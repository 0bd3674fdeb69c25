//! Domain-specific error types for the template renderer.
//!
//! Every pipeline stage returns its own [`thiserror`] type. The top-level
//! [`TmplError`] aggregates them via `#[from]` and maps each failure class to
//! a stable process exit status so calling scripts can branch on it.
//!
//! # Error hierarchy
//!
//! ```text
//! TmplError                       exit
//! ├── Environment(EnvironmentError)  2
//! ├── Config(ConfigError)            3
//! ├── Validation(ValidationError)    4
//! ├── Engine(EngineError)            5
//! ├── Library(LibraryError)          6
//! ├── Mapping(MappingError)          7
//! ├── Render(RenderError)            8
//! ├── Transfer(TransferError)        9
//! ├── Metadata(MetadataError)       10
//! └── Stdin(StdinError)             11
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a single run.
#[derive(Error, Debug)]
pub enum TmplError {
    /// The executing environment is unusable (missing executables, bad dirs).
    #[error("Invalid environment: {0}")]
    Environment(#[from] EnvironmentError),

    /// A configuration document could not be read, parsed, or included.
    #[error("Unable to parse template configuration file - {0}")]
    Config(#[from] ConfigError),

    /// The merged configuration violates a structural rule.
    #[error("Unable to validate template configuration file - {0}")]
    Validation(#[from] ValidationError),

    /// The template engine could not be initialised.
    #[error("Unable to initialize template engine - {0}")]
    Engine(#[from] EngineError),

    /// An extension library could not be resolved or imported.
    #[error("Unable to load library extensions - {0}")]
    Library(#[from] LibraryError),

    /// Path mapping between sources, working files, and outputs failed.
    #[error("{0}")]
    Mapping(#[from] MappingError),

    /// A template could not be rendered or a file could not be staged.
    #[error("{0}")]
    Render(#[from] RenderError),

    /// The working directory could not be mirrored to the output directory.
    #[error("Unable to transfer files to output directory - {0}")]
    Transfer(#[from] TransferError),

    /// Permissions, ownership, or symlinks could not be applied.
    #[error("{0}")]
    Metadata(#[from] MetadataError),

    /// Rendering from standard input failed.
    #[error("{0}")]
    Stdin(#[from] StdinError),
}

impl TmplError {
    /// Stable process exit status for this failure class.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Environment(_) => 2,
            Self::Config(_) => 3,
            Self::Validation(_) => 4,
            Self::Engine(_) => 5,
            Self::Library(_) => 6,
            Self::Mapping(_) => 7,
            Self::Render(_) => 8,
            Self::Transfer(_) => 9,
            Self::Metadata(_) => 10,
            Self::Stdin(_) => 11,
        }
    }
}

/// Malformed path specifications (`[a,b]` lists, `[N-M]` ranges, globs).
#[derive(Error, Debug)]
pub enum PathSpecError {
    /// Brackets are missing a partner or appear in the wrong order.
    #[error("path specification \"{spec}\" does not have balanced brackets")]
    Unbalanced {
        /// The offending specification.
        spec: String,
    },

    /// The bracket expression is neither a list nor a range.
    #[error("path specification \"{spec}\" is malformed - {reason}")]
    Malformed {
        /// The offending specification.
        spec: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A numeric range whose upper bound does not exceed its lower bound.
    #[error(
        "upper bound in path specification range expression \"{spec}\" is not greater than the lower bound ({low}-{high})"
    )]
    Range {
        /// The offending specification.
        spec: String,
        /// Lower bound as written.
        low: u64,
        /// Upper bound as written.
        high: u64,
    },

    /// The glob pattern was rejected or the filesystem walk failed.
    #[error("path specification \"{spec}\" globbing failed - {message}")]
    Glob {
        /// The offending specification.
        spec: String,
        /// Underlying glob failure.
        message: String,
    },
}

/// Errors that arise from loading and merging configuration documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document does not exist.
    #[error("template configuration file \"{}\" does not exist", .path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An I/O error occurred while reading a document.
    #[error("unable to open template configuration file \"{}\" - {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid YAML/TOML.
    #[error("unable to parse template configuration file \"{}\" - {message}", .path.display())]
    Parse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The document's top level is not a mapping.
    #[error(
        "template configuration file \"{}\" does not resolve to a dictionary of specifications",
        .path.display()
    )]
    NotAMapping {
        /// Path to the offending file.
        path: PathBuf,
    },

    /// An `include` entry is malformed or does not resolve to a file.
    #[error("template configuration file \"{}\" include specification error - {reason}", .path.display())]
    Include {
        /// Path to the including document.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A document includes itself, directly or transitively.
    #[error("template configuration file \"{}\" is included recursively", .path.display())]
    IncludeCycle {
        /// The document that closes the cycle.
        path: PathBuf,
    },
}

/// Structural violations found in a merged configuration document.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// `files` is not a sequence of mappings.
    #[error("\"files\" key is not a list of specification dictionaries")]
    FilesNotMappings,

    /// A `files` element lacks `dst`.
    #[error("one or more \"files\" specifications do not specify the \"dst\" key")]
    MissingDst,

    /// A `files` element has a field of the wrong type.
    #[error("\"files\" specification \"{dst}\" has an invalid \"{field}\" value - expected {expected}")]
    FieldType {
        /// The declaration's `dst` (or `<unknown>`).
        dst: String,
        /// Offending field name.
        field: &'static str,
        /// Expected type description.
        expected: &'static str,
    },

    /// `lib` is not a sequence of strings.
    #[error("\"lib\" key is not a list of file path specifications")]
    LibNotStrings,
}

/// Errors computing the source/working/destination correspondence.
#[derive(Error, Debug)]
pub enum MappingError {
    /// A path specification inside the declaration is malformed.
    #[error("unable to compute template {role} path mapping for \"{dst}\" - {source}")]
    Spec {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// Which field failed (`source`, `destination`, `symlink`).
        role: &'static str,
        /// The expander error.
        source: PathSpecError,
    },

    /// A declaration could not be decoded into a file specification.
    #[error("unable to compute template path mapping for \"{dst}\" - {message}")]
    Invalid {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// Decoder diagnostic.
        message: String,
    },

    /// A field expanded to zero paths.
    #[error(
        "unable to compute template {role} path mapping for \"{dst}\" - \"{field}\" does not resolve to any valid {role} paths"
    )]
    Empty {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// Which field failed (`source`, `destination`, `symlink`).
        role: &'static str,
        /// Field name in the declaration.
        field: &'static str,
    },

    /// An expanded source path is not an existing file.
    #[error(
        "unable to compute template source path mapping for \"{dst}\" - \"{}\" does not correspond to a path to an existing file",
        .path.display()
    )]
    MissingSource {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// The missing source.
        path: PathBuf,
    },

    /// `dst` expanded to several paths while `src` was given.
    #[error(
        "unable to compute template destination path mapping for \"{dst}\" - \"dst\" cannot contain expansion expressions if \"src\" is specified ({count} paths)"
    )]
    AmbiguousDestination {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// Number of paths `dst` expanded to.
        count: usize,
    },

    /// `symlink` was given for a declaration with several sources.
    #[error(
        "unable to compute template symlink path mapping for \"{dst}\" - \"symlink\" cannot be specified if \"{field}\" contains expansion expressions"
    )]
    SymlinkCardinality {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// The field that expanded to several sources (`src` or `dst`).
        field: &'static str,
    },

    /// `symlink` expanded to more than one path.
    #[error(
        "unable to compute template symlink path mapping for \"{dst}\" - \"symlink\" must resolve to exactly one path ({count} paths)"
    )]
    AmbiguousSymlink {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// Number of paths `symlink` expanded to.
        count: usize,
    },

    /// A destination falls outside the output directory.
    #[error(
        "unable to compute template destination path mapping for \"{dst}\" - \"{}\" is outside of the output directory \"{}\"",
        .path.display(),
        .root.display()
    )]
    OutsideOutput {
        /// The declaration's unexpanded `dst`.
        dst: String,
        /// The resolved destination.
        path: PathBuf,
        /// The output root.
        root: PathBuf,
    },
}

/// Errors initialising the template engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configured delimiters are rejected by the engine.
    #[error("invalid template delimiters - {0}")]
    Syntax(String),

    /// The template root is not a directory.
    #[error("template directory \"{}\" does not exist", .0.display())]
    MissingRoot(PathBuf),
}

/// Errors resolving or importing extension libraries.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// A `lib` entry is a malformed path specification.
    #[error("unable to parse library extension paths - {0}")]
    Spec(#[from] PathSpecError),

    /// A resolved library path does not exist.
    #[error("library extension file at \"{}\" does not exist", .0.display())]
    NotFound(PathBuf),

    /// The library file could not be read.
    #[error("unable to read library extension \"{}\" - {source}", .path.display())]
    Io {
        /// Library path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The library does not compile or its top level fails to evaluate.
    #[error("unable to execute library extension \"{}\" - {message}", .path.display())]
    Load {
        /// Library path.
        path: PathBuf,
        /// Engine diagnostic.
        message: String,
    },
}

/// Errors rendering templates or staging files into the working directory.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template failed to compile.
    #[error("Unable to load template \"{template}\" - syntax error{} - {message}", line_suffix(.line))]
    TemplateSyntax {
        /// Template identifier (path relative to the template root).
        template: String,
        /// 1-based line number, when the engine reports one.
        line: Option<usize>,
        /// Engine diagnostic.
        message: String,
    },

    /// The template compiled but rendering failed.
    #[error("Unable to render template \"{template}\"{} - {message}", line_suffix(.line))]
    TemplateRender {
        /// Template identifier (path relative to the template root).
        template: String,
        /// 1-based line number, when the engine reports one.
        line: Option<usize>,
        /// Engine diagnostic.
        message: String,
    },

    /// A working-directory write or copy failed.
    #[error("Unable to write \"{target}\" to working directory - {action} - {source}")]
    Filesystem {
        /// Destination path relative to the output root.
        target: String,
        /// What was being attempted.
        action: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors mirroring the working directory onto the output directory.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The output directory could not be created.
    #[error("unable to create output directory \"{}\" - {source}", .path.display())]
    CreateOutput {
        /// Output directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The mirror tool could not be started.
    #[error("unable to run {tool} - {message}")]
    Spawn {
        /// Tool name.
        tool: String,
        /// Spawn diagnostic.
        message: String,
    },

    /// The mirror tool exited non-zero.
    #[error("{tool} subprocess returned non-zero exit code \"{code}\"")]
    Exit {
        /// Tool name.
        tool: String,
        /// Exit status (`-1` when killed by a signal).
        code: i32,
    },
}

/// Errors applying permissions, ownership, and symlinks.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// `chmod` failed.
    #[error("Unable to set permissions of \"{}\" to \"{mode}\" - {message}", .path.display())]
    Chmod {
        /// Output file.
        path: PathBuf,
        /// Mode argument string.
        mode: String,
        /// Failure detail.
        message: String,
    },

    /// `chown` failed.
    #[error("Unable to set ownership of \"{}\" to \"{owner}\" - {message}", .path.display())]
    Chown {
        /// Output file.
        path: PathBuf,
        /// Owner argument string.
        owner: String,
        /// Failure detail.
        message: String,
    },

    /// A non-symlink already occupies the link location.
    #[error(
        "Link destination \"{}\" for file \"{}\" is an existing regular file or directory",
        .link.display(),
        .target.display()
    )]
    SymlinkCollision {
        /// Link location.
        link: PathBuf,
        /// File the link should point at.
        target: PathBuf,
    },

    /// Creating or replacing the symlink failed.
    #[error("Unable to create symlink \"{}\" for \"{}\" - {message}", .link.display(), .target.display())]
    Symlink {
        /// Link location.
        link: PathBuf,
        /// File the link should point at.
        target: PathBuf,
        /// Failure detail.
        message: String,
    },
}

/// Errors that arise while rendering standard input.
#[derive(Error, Debug)]
pub enum StdinError {
    /// Standard input could not be read.
    #[error("Unable to read from STDIN - {0}")]
    Read(#[from] std::io::Error),

    /// The template could not be rendered.
    #[error("Unable to render template from STDIN{} - {message}", line_suffix(.line))]
    Render {
        /// 1-based line number, when the engine reports one.
        line: Option<usize>,
        /// Engine diagnostic.
        message: String,
    },

    /// The rendered output could not be written.
    #[error("Unable to write rendered template to STDOUT - {source}")]
    Write {
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors validating the executing environment.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The rsync executable does not exist.
    #[error("Specified rsync executable path \"{}\" does not exist.", .0.display())]
    MissingRsync(PathBuf),

    /// `--base-dir` is not a directory.
    #[error("Specified template base directory \"{}\" does not exist.", .0.display())]
    MissingBaseDir(PathBuf),

    /// The configuration path does not exist.
    #[error("Specified template configuration path \"{}\" does not exist.", .0.display())]
    MissingConfig(PathBuf),

    /// No configuration file could be selected from a directory.
    #[error(
        "Specified template configuration file directory \"{}\" does not contain any selectable template configuration files.",
        .0.display()
    )]
    NoSelectableConfig(PathBuf),

    /// The working directory path is occupied by a regular file.
    #[error("Specified working directory \"{}\" is an existing file.", .0.display())]
    WorkingDirIsFile(PathBuf),

    /// The working directory could not be reset.
    #[error("Unable to prepare working directory \"{}\" - {source}", .path.display())]
    WorkingDir {
        /// Working directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The current directory could not be determined.
    #[error("Unable to determine current directory - {0}")]
    CurrentDir(std::io::Error),

    /// The log file could not be opened.
    #[error("Unable to open log file \"{}\" - {source}", .path.display())]
    LogFile {
        /// Log file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[allow(clippy::ref_option)]
fn line_suffix(line: &Option<usize>) -> String {
    line.map_or_else(String::new, |l| format!(" on line {l}"))
}
