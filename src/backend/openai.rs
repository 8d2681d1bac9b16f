use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::ChatCompletionBackend;
use crate::error::CompletionError;
use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// A backend implementation for OpenAI and OpenAI-compatible endpoints.
///
/// Requests and responses use the `async-openai` types; the call itself is a
/// single `reqwest` POST so the HTTP status is seen directly and nothing is
/// retried. Holds only the credential and endpoint, so one instance can
/// serve concurrent callers.
pub struct OpenAIBackend {
    client: Client,
    api_key: SecretString,
    url: String,
}

impl OpenAIBackend {
    /// Creates a new `OpenAIBackend` for `api_base` authorized by `api_key`.
    pub fn new(api_key: SecretString, api_base: &str) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .build()
            .map_err(|e| CompletionError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url: format!("{}{COMPLETIONS_PATH}", api_base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatCompletionBackend for OpenAIBackend {
    async fn chat_completion(
        &self,
        req: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, CompletionError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&req)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| CompletionError::RemoteService(format!("malformed response: {e}")))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

// A 401 rejects the credential whatever the body says; otherwise only an
// OpenAI error object naming the key does.
fn classify_failure(status: StatusCode, body: &str) -> CompletionError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let rejected_key = parsed.as_ref().is_some_and(|e| {
        e.error.code.as_deref() == Some("invalid_api_key")
            || e.error.kind.as_deref() == Some("authentication_error")
    });

    let message = match parsed {
        Some(e) => e.error.message,
        None => body.trim().to_string(),
    };
    let message = format!("HTTP {status}: {message}");

    if status == StatusCode::UNAUTHORIZED || rejected_key {
        CompletionError::Authentication(message)
    } else {
        CompletionError::RemoteService(message)
    }
}
