//! OpenAI-compatible chat completions backend.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http;
use crate::ports::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmFuture};
use crate::ports::PortError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
const API_KEY_VAR: &str = "OPENAI_API_KEY";
const DEFAULT_MODEL: &str = "gpt-4.1";

/// [`LlmClient`] for OpenAI-compatible `/chat/completions` endpoints.
///
/// `OPENAI_API_KEY` is read on every call; `OPENAI_BASE_URL` redirects the
/// client to a compatible server.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client for the public endpoint, or `OPENAI_BASE_URL` when set.
    #[must_use]
    pub fn new() -> Self {
        let base_url = env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(&base_url)
    }

    /// Creates a client for a specific compatible endpoint.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self { client: http::client(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Turn<'a>>,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl<'a> ChatBody<'a> {
    fn from_request(request: &'a CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(Turn { role: "system", content: &request.system });
        }
        messages.push(Turn { role: "user", content: &request.prompt });
        Self { model: &request.model, max_tokens: request.max_tokens, messages }
    }
}

impl TryFrom<ChatReply> for CompletionResponse {
    type Error = PortError;

    fn try_from(reply: ChatReply) -> Result<Self, Self::Error> {
        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or("OpenAI API response contained no message content")?;
        let (prompt_tokens, completion_tokens) =
            reply.usage.map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));
        Ok(Self { text, prompt_tokens, completion_tokens })
    }
}

impl LlmClient for OpenAiClient {
    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn complete(&self, request: &CompletionRequest) -> LlmFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let key = http::api_key(API_KEY_VAR)?;
            debug!(model = %request.model, url = %self.endpoint(), "sending OpenAI request");
            let builder = self
                .client
                .post(self.endpoint())
                .bearer_auth(key)
                .json(&ChatBody::from_request(&request));
            let reply: ChatReply = http::send_json("OpenAI", builder).await?;
            CompletionResponse::try_from(reply)
        })
    }
}
