//! Error taxonomy for the workspace and project layers.
//!
//! Command handlers flatten these into `String` at the CLI boundary; the
//! library surfaces the typed variants so callers can tell a scope violation
//! from an I/O failure or a summarizer outage.

use std::path::PathBuf;

use thiserror::Error;

use crate::ports::PortError;

/// A pattern that cannot be parsed by the gitignore-style matcher.
///
/// The matcher itself never returns this: malformed patterns are skipped as
/// non-matching. Only the strict validator surfaces it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Nothing left to match once the `!`, `/` and trailing `/` markers are removed.
    #[error("pattern {0:?} has no body to match against")]
    EmptyBody(String),
    /// Two consecutive separators inside the pattern.
    #[error("pattern {0:?} contains an empty path segment")]
    EmptySegment(String),
    /// Bracket expressions are not supported.
    #[error("pattern {0:?} uses an unsupported character class")]
    CharacterClass(String),
    /// Backslash escapes are only accepted before a leading `!` or `#`.
    #[error("pattern {0:?} contains an unsupported escape sequence")]
    Escape(String),
    /// A segment is not a valid glob, such as an unclosed `{`.
    #[error("pattern {pattern:?} is not a valid glob: {reason}")]
    Glob {
        /// The pattern as written.
        pattern: String,
        /// Why the glob was rejected.
        reason: String,
    },
}

/// Failures while walking or reading the project tree.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The directory walk itself failed (permissions, vanished entries).
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// Path that could not be visited.
        path: PathBuf,
        /// Underlying walk error.
        #[source]
        source: walkdir::Error,
    },
    /// A file could not be stat'd or read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Violations of the execution-context invariants.
///
/// These are security boundaries and are never downgraded to warnings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Project root or working directory was given as a relative path.
    #[error("project root and working directory must be absolute paths (got {0})")]
    NotAbsolute(PathBuf),
    /// The target file was given as a relative path.
    #[error("target file must be an absolute path (got {0})")]
    TargetNotAbsolute(PathBuf),
    /// The project root lacks the `.strata` marker directory.
    #[error("{0} is not a valid project root: missing .strata directory")]
    MissingMarker(PathBuf),
    /// The working directory escapes the project root.
    #[error("working directory {working} is not within project root {root}")]
    WorkingOutsideRoot {
        /// Offending working directory.
        working: PathBuf,
        /// Project root it should be under.
        root: PathBuf,
    },
    /// The target file does not exist.
    #[error("target file {0} does not exist")]
    TargetMissing(PathBuf),
    /// The target is a directory rather than a file.
    #[error("target {0} is a directory, expected a file")]
    TargetIsDirectory(PathBuf),
    /// The target file escapes the working directory.
    #[error("target file {target} is outside working directory {working}")]
    TargetOutsideWorking {
        /// Offending target file.
        target: PathBuf,
        /// Working directory it should be under.
        working: PathBuf,
    },
    /// No ancestor of the starting directory carries project metadata.
    #[error("{0} is not within a project (no .strata/metadata.yaml found)")]
    RootNotFound(PathBuf),
}

/// Failures while populating module annotations.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// The summarizer failed for one module.
    #[error("failed to create annotation for module {module:?}: {source}")]
    Summarizer {
        /// Module being summarized.
        module: String,
        /// Error reported by the summarizer.
        #[source]
        source: PortError,
    },
    /// The whole-tree external context request failed.
    #[error("failed to create external contexts: {source}")]
    ExternalContext {
        /// Error reported by the summarizer.
        #[source]
        source: PortError,
    },
    /// A module file could not be read for the summarizer payload.
    #[error("failed to read {path} for module {module:?}: {source}")]
    ReadFile {
        /// Module owning the file.
        module: String,
        /// File path relative to the project root.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: PortError,
    },
    /// The task was abandoned because another branch already failed.
    #[error("annotation of module {0:?} cancelled after an earlier failure")]
    Cancelled(String),
    /// A scheduler task panicked or was aborted by the runtime.
    #[error("annotation task failed to complete: {0}")]
    TaskPanicked(String),
}

/// Failures of project-level operations (create, update, load, scope).
#[derive(Debug, Error)]
pub enum ProjectError {
    /// A `.strata` directory already exists inside the root.
    #[error("a project configuration already exists within the given root: {0}")]
    AlreadyInitialized(String),
    /// The directory is not a configured project root.
    #[error("folder {0} has no project configuration")]
    NotInitialized(PathBuf),
    /// Reading or writing project state failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying error from the filesystem port.
        #[source]
        source: PortError,
    },
    /// A YAML document could not be (de)serialized.
    #[error("{context}: {source}")]
    Yaml {
        /// What was being (de)serialized.
        context: String,
        /// Underlying serde error.
        #[source]
        source: serde_yaml::Error,
    },
    /// The configuration is present but invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Stored and fresh module trees disagree on their module names.
    #[error(
        "module hierarchy mismatch between stored metadata and filesystem snapshot \
         (only stored: {only_stored:?}, only fresh: {only_fresh:?}); run `strata update` first"
    )]
    HierarchyMismatch {
        /// Names present only in the stored tree.
        only_stored: Vec<String>,
        /// Names present only in the fresh tree.
        only_fresh: Vec<String>,
    },
    /// A module the caller asked for does not exist in the tree.
    #[error("no module owns path {0:?}")]
    ModuleNotFound(String),
    /// File selection failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Execution context validation failed.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// Annotation failed.
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

impl ProjectError {
    pub(crate) fn io(
        context: impl Into<String>,
        source: PortError,
    ) -> Self {
        Self::Io { context: context.into(), source }
    }

    pub(crate) fn yaml(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::Yaml { context: context.into(), source }
    }
}
