//! Anthropic messages API backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http;
use crate::ports::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmFuture};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// [`LlmClient`] over the Anthropic messages API.
///
/// `ANTHROPIC_API_KEY` is read on every call, so constructing the client never fails.
pub struct AnthropicClient {
    client: Client,
}

impl AnthropicClient {
    /// Creates a client.
    #[must_use]
    pub fn new() -> Self {
        Self { client: http::client() }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<Block>,
    usage: Usage,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl<'a> MessagesBody<'a> {
    fn from_request(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: [UserTurn { role: "user", content: &request.prompt }],
        }
    }
}

impl From<MessagesReply> for CompletionResponse {
    fn from(reply: MessagesReply) -> Self {
        Self {
            text: reply.content.into_iter().map(|block| block.text).collect(),
            prompt_tokens: reply.usage.input_tokens,
            completion_tokens: reply.usage.output_tokens,
        }
    }
}

impl LlmClient for AnthropicClient {
    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn complete(&self, request: &CompletionRequest) -> LlmFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let key = http::api_key(API_KEY_VAR)?;
            debug!(model = %request.model, "sending Anthropic request");
            let builder = self
                .client
                .post(MESSAGES_URL)
                .header("x-api-key", key)
                .header("anthropic-version", API_VERSION)
                .json(&MessagesBody::from_request(&request));
            let reply: MessagesReply = http::send_json("Anthropic", builder).await?;
            Ok(reply.into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: &str) -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            system: system.into(),
            prompt: "hi".into(),
            max_tokens: 10,
        }
    }

    #[test]
    fn body_omits_empty_system_prompt() {
        let req = request("");
        let json = serde_json::to_value(MessagesBody::from_request(&req)).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");

        let req = request("be terse");
        let json = serde_json::to_value(MessagesBody::from_request(&req)).unwrap();
        assert_eq!(json["system"], "be terse");
    }

    #[test]
    fn reply_concatenates_text_blocks() {
        let raw = r#"{"content":[{"type":"text","text":"a"},{"type":"text","text":"b"}],
                      "usage":{"input_tokens":3,"output_tokens":4}}"#;
        let reply: MessagesReply = serde_json::from_str(raw).unwrap();
        let response = CompletionResponse::from(reply);
        assert_eq!(response.text, "ab");
        assert_eq!(response.prompt_tokens, 3);
        assert_eq!(response.completion_tokens, 4);
    }
}
