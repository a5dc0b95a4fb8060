//! Language-model completion port.

use serde::{Deserialize, Serialize};

use super::PortFuture;

/// Future returned by [`LlmClient::complete`].
pub type LlmFuture<'a> = PortFuture<'a, CompletionResponse>;

/// One single-turn completion: system instructions plus a user prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Backend-specific model identifier.
    pub model: String,
    /// System prompt; omitted from the wire request when empty.
    pub system: String,
    /// User message.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// Generated text plus the usage the backend reported (zero when it reported none).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Concatenated text output.
    pub text: String,
    /// Input tokens billed.
    pub prompt_tokens: u32,
    /// Output tokens billed.
    pub completion_tokens: u32,
}

/// A text-generation backend.
pub trait LlmClient: Send + Sync {
    /// Model used when the configuration names none.
    fn default_model(&self) -> &str;

    /// Runs one completion.
    ///
    /// # Errors
    ///
    /// Returns an error when credentials are missing, the transport fails, or
    /// the backend answers with an error status or an unreadable body.
    fn complete(&self, request: &CompletionRequest) -> LlmFuture<'_>;
}
