//! Filesystem scope: pattern matching, file selection and execution context.

pub mod execution;
pub mod matcher;
pub mod selector;

pub use execution::{discover_project_root, ExecutionContext, MARKER_DIR, METADATA_FILE};
pub use matcher::{is_excluded, is_included, validate_pattern, PatternList};
pub use selector::select;
