//! HTTP plumbing shared by the language-model adapters.

use std::env;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::ports::PortError;

/// Summaries of large modules can take minutes to generate.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds the shared HTTP client.
pub(crate) fn client() -> Client {
    Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_else(|_| Client::new())
}

/// Reads an API key from the environment.
pub(crate) fn api_key(var: &str) -> Result<String, PortError> {
    env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| format!("{var} environment variable not set").into())
}

/// Sends `request` and decodes a successful JSON body into `T`.
///
/// Error statuses are reported with the backend's own message when the body
/// carries one.
pub(crate) async fn send_json<T: DeserializeOwned>(
    backend: &str,
    request: RequestBuilder,
) -> Result<T, PortError> {
    let response =
        request.send().await.map_err(|e| format!("{backend} API request failed: {e}"))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("failed to read {backend} API response: {e}"))?;

    if !status.is_success() {
        warn!(backend, status = status.as_u16(), "backend returned an error status");
        return Err(format!("{backend} API error ({}): {}", status.as_u16(), error_message(&body))
            .into());
    }
    serde_json::from_str(&body)
        .map_err(|e| format!("failed to parse {backend} API response: {e}").into())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// `error.message` from an error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| body.trim().to_string(), |envelope| envelope.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_error_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(error_message(body), "Overloaded");
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(error_message("  bad gateway\n"), "bad gateway");
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = api_key("STRATA_TEST_UNSET_KEY").unwrap_err();
        assert_eq!(err.to_string(), "STRATA_TEST_UNSET_KEY environment variable not set");
    }
}
