//! Summarizer port: turns module payloads into annotation text.
//!
//! The request and response types double as the JSON payloads exchanged with
//! the language model, so their field names are part of the prompt contract.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// Boxed future returned by [`Summarizer`] methods.
pub type SummarizerFuture<'a, T> = PortFuture<'a, T>;

/// A file handed to the summarizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileContent {
    /// Path relative to the project root.
    pub path: String,
    /// Full file content.
    pub content: String,
}

impl FileContent {
    /// Builds a file entry from raw bytes. Invalid UTF-8 sequences become U+FFFD.
    #[must_use]
    pub fn from_bytes(path: String, bytes: &[u8]) -> Self {
        Self { path, content: String::from_utf8_lossy(bytes).into_owned() }
    }
}

/// A named piece of context text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedContext {
    /// Module name.
    pub name: String,
    /// Context text.
    pub content: String,
}

/// Input for summarizing one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleContextRequest {
    /// Module being summarized.
    pub target_module_name: String,
    /// The module's own files.
    pub target_module_files: Vec<FileContent>,
    /// Raw directories folded into the module.
    pub target_module_directories: Vec<String>,
    /// Public contexts of the immediate sub-modules.
    pub sub_modules_public_contexts: Vec<NamedContext>,
}

/// Summaries produced for one module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleContextResponse {
    /// Summary of the module's own files.
    #[serde(default)]
    pub internal_context: String,
    /// Synopsis of the module and its sub-modules.
    #[serde(default)]
    pub public_context: String,
}

/// One module's summaries as seen by the whole-tree request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleOverview {
    /// Module name.
    pub name: String,
    /// Parent module name, empty for the root.
    pub parent_name: String,
    /// Internal context of the module.
    pub internal_context: String,
    /// Public context of the module.
    pub public_context: String,
}

/// Input for computing external contexts of the whole tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalContextsRequest {
    /// Every module in the tree.
    pub modules: Vec<ModuleOverview>,
}

/// External context for one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalContext {
    /// Module name.
    pub name: String,
    /// External context text.
    pub external_context: String,
}

/// External contexts for the whole tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalContextsResponse {
    /// One entry per module the backend described.
    #[serde(default)]
    pub modules: Vec<ExternalContext>,
}

/// Produces module annotations.
pub trait Summarizer: Send + Sync {
    /// Summarizes one module from its files and its children's public contexts.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or its answer is unusable.
    fn summarize_module(
        &self,
        request: ModuleContextRequest,
    ) -> SummarizerFuture<'_, ModuleContextResponse>;

    /// Computes external contexts for every module in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or its answer is unusable.
    fn external_contexts(
        &self,
        request: ExternalContextsRequest,
    ) -> SummarizerFuture<'_, ExternalContextsResponse>;
}
