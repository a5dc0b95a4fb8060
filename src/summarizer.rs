//! Summarizer strategy backed by a language model.
//!
//! Each call renders fixed instructions as the system prompt, sends the
//! request payload as JSON, and expects a JSON document back. Answers wrapped
//! in markdown code fences are accepted.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::adapters::live::anthropic::AnthropicClient;
use crate::adapters::live::openai::OpenAiClient;
use crate::config::{Config, Provider};
use crate::error::ProjectError;
use crate::ports::llm::{CompletionRequest, LlmClient};
use crate::ports::PortError;
use crate::ports::summarizer::{
    ExternalContextsRequest, ExternalContextsResponse, ModuleContextRequest,
    ModuleContextResponse, Summarizer, SummarizerFuture,
};

const MAX_TOKENS: u32 = 8192;

const MODULE_INSTRUCTIONS: &str = "\
You summarize one module of a software project for other engineers and for \
language models that will edit the code later.

The user message is a JSON object with:
- target_module_name: the module being summarized;
- target_module_files: the module's own files (path and content);
- target_module_directories: directories whose files belong to the module;
- sub_modules_public_contexts: summaries of the module's sub-modules.

Answer with a single JSON object and nothing else:
{\"internal_context\": \"...\", \"public_context\": \"...\"}

internal_context describes only the module's own files: responsibilities, key \
types and functions, invariants. Do not describe sub-modules.
public_context is a self-contained synopsis of the module and everything \
beneath it, written for code outside the module: what it offers and how to use it.";

const EXTERNAL_INSTRUCTIONS: &str = "\
You describe how each module of a software project fits into the whole.

The user message is a JSON object with a `modules` array; each entry has name, \
parent_name, internal_context and public_context.

For every module, write an external_context: where the module sits in the \
hierarchy, what surrounds it, and what its neighbours and ancestors provide that \
code inside the module may rely on.

Answer with a single JSON object and nothing else:
{\"modules\": [{\"name\": \"...\", \"external_context\": \"...\"}]}";

/// [`Summarizer`] implementation over an [`LlmClient`].
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    log_payloads: bool,
}

impl LlmSummarizer {
    /// Creates a summarizer using `model`, or the client's default model.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| llm.default_model().to_string());
        Self { llm, model, max_tokens: MAX_TOKENS, log_payloads: false }
    }

    /// Logs full prompts and raw answers at debug level when enabled.
    #[must_use]
    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    /// Model identifier sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn ask<Req, Resp>(
        &self,
        instructions: &str,
        payload: &Req,
    ) -> Result<Resp, PortError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let prompt = serde_json::to_string_pretty(payload)?;
        if self.log_payloads {
            debug!(model = %self.model, %prompt, "summarizer request");
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            system: instructions.to_string(),
            prompt,
            max_tokens: self.max_tokens,
        };
        let response = self.llm.complete(&request).await?;

        if self.log_payloads {
            debug!(text = %response.text, "summarizer response");
        }
        debug!(
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "summarizer call complete"
        );

        serde_json::from_str(strip_fences(&response.text))
            .map_err(|e| format!("summarizer returned malformed JSON: {e}").into())
    }
}

impl Summarizer for LlmSummarizer {
    fn summarize_module(
        &self,
        request: ModuleContextRequest,
    ) -> SummarizerFuture<'_, ModuleContextResponse> {
        Box::pin(async move { self.ask(MODULE_INSTRUCTIONS, &request).await })
    }

    fn external_contexts(
        &self,
        request: ExternalContextsRequest,
    ) -> SummarizerFuture<'_, ExternalContextsResponse> {
        Box::pin(async move { self.ask(EXTERNAL_INSTRUCTIONS, &request).await })
    }
}

/// Strips an optional markdown code fence (with or without a language tag).
#[must_use]
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Builds the LLM client for a provider.
#[must_use]
pub fn client_for(provider: Provider) -> Arc<dyn LlmClient> {
    match provider {
        Provider::Anthropic => Arc::new(AnthropicClient::new()),
        Provider::OpenAi => Arc::new(OpenAiClient::new()),
    }
}

/// Selects and configures the summarizer described by `config`.
///
/// # Errors
///
/// Returns [`ProjectError::Config`] when the provider is unknown.
pub fn from_config(config: &Config) -> Result<Arc<dyn Summarizer>, ProjectError> {
    let provider = config.provider()?;
    let summarizer = LlmSummarizer::new(client_for(provider), config.model.clone())
        .with_payload_logging(config.logging.request_response_debug);
    info!(%provider, model = summarizer.model(), "summarizer configured");
    Ok(Arc::new(summarizer))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ports::llm::{CompletionResponse, LlmFuture};
    use crate::ports::summarizer::{FileContent, ModuleOverview};

    struct CannedLlm {
        answer: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedLlm {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self { answer: answer.to_string(), seen: Mutex::new(Vec::new()) })
        }
    }

    impl LlmClient for CannedLlm {
        fn default_model(&self) -> &str {
            "canned-model"
        }

        fn complete(&self, request: &CompletionRequest) -> LlmFuture<'_> {
            self.seen.lock().unwrap().push(request.clone());
            let text = self.answer.clone();
            Box::pin(async move {
                Ok(CompletionResponse { text, prompt_tokens: 1, completion_tokens: 1 })
            })
        }
    }

    fn module_request() -> ModuleContextRequest {
        ModuleContextRequest {
            target_module_name: "src".into(),
            target_module_files: vec![FileContent { path: "src/a.rs".into(), content: "x".into() }],
            target_module_directories: vec!["src".into()],
            sub_modules_public_contexts: vec![],
        }
    }

    #[tokio::test]
    async fn parses_fenced_module_answer() {
        let llm = CannedLlm::new(
            "```json\n{\"internal_context\": \"inner\", \"public_context\": \"outer\"}\n```",
        );
        let summarizer = LlmSummarizer::new(llm.clone(), None);

        let response = summarizer.summarize_module(module_request()).await.unwrap();

        assert_eq!(response.internal_context, "inner");
        assert_eq!(response.public_context, "outer");
        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].model, "canned-model");
        assert!(seen[0].prompt.contains("\"target_module_name\": \"src\""));
        assert!(seen[0].system.contains("internal_context"));
    }

    #[tokio::test]
    async fn external_answer_is_parsed() {
        let llm = CannedLlm::new(r#"{"modules":[{"name":"src","external_context":"ext"}]}"#);
        let summarizer = LlmSummarizer::new(llm.clone(), Some("override".into()));
        let request = ExternalContextsRequest {
            modules: vec![ModuleOverview {
                name: "src".into(),
                parent_name: ".".into(),
                internal_context: "i".into(),
                public_context: "p".into(),
            }],
        };

        let response = summarizer.external_contexts(request).await.unwrap();

        assert_eq!(response.modules[0].external_context, "ext");
        assert_eq!(llm.seen.lock().unwrap()[0].model, "override");
    }

    #[tokio::test]
    async fn prose_answer_is_an_error() {
        let summarizer = LlmSummarizer::new(CannedLlm::new("I cannot help with that."), None);
        let err = summarizer.summarize_module(module_request()).await.unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_fences("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```\n"), "{\"a\":1}");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = Config { provider: "gemini".into(), ..Config::default() };
        assert!(matches!(from_config(&config), Err(ProjectError::Config(_))));
        assert!(from_config(&Config::default()).is_ok());
    }
}
