//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the core and an external system
//! (filesystem, language model, summarizer). Implementations live in
//! `src/adapters/` and `src/summarizer.rs`.

pub mod filesystem;
pub mod llm;
pub mod summarizer;

use std::future::Future;
use std::pin::Pin;

pub use filesystem::FileSystem;
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmFuture};
pub use summarizer::{
    ExternalContext, ExternalContextsRequest, ExternalContextsResponse, FileContent,
    ModuleContextRequest, ModuleContextResponse, ModuleOverview, NamedContext, Summarizer,
    SummarizerFuture,
};

/// Error type crossing every port boundary.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed, sendable future resolving to a port result. Keeps async ports dyn-compatible.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortError>> + Send + 'a>>;
