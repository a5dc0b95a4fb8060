//! Service context bundling the port trait objects.

use std::sync::Arc;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::config::Config;
use crate::error::ProjectError;
use crate::ports::filesystem::FileSystem;
use crate::ports::summarizer::Summarizer;

/// Bundles the external boundaries a project operation needs.
///
/// Ports are reference-counted so annotation tasks can hold their own handle.
pub struct ServiceContext {
    /// Filesystem for project state and file contents.
    pub fs: Arc<dyn FileSystem>,
    /// Summarizer producing module annotations.
    pub summarizer: Arc<dyn Summarizer>,
}

impl ServiceContext {
    /// Wires explicit adapters, typically fakes in tests.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { fs, summarizer }
    }

    /// Creates a live context: real filesystem plus the summarizer selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Config`] when the configured provider is unknown.
    pub fn live(config: &Config) -> Result<Self, ProjectError> {
        Ok(Self { fs: Arc::new(LiveFileSystem), summarizer: crate::summarizer::from_config(config)? })
    }
}
