use std::sync::Arc;

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionResponse,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::ChatCompletionBackend;
use crate::backend::openai::OpenAIBackend;
use crate::backend::traced::TracedBackend;
use crate::config::Settings;
use crate::error::CompletionError;
use crate::trace::{LangSmithTracer, RunInfo, RunType, Tracer, traced};

const PIPELINE_RUN: &str = "pipeline";

/// Sends one prompt to a chat-completion backend and returns the first
/// choice's text.
///
/// Holds only immutable state; share it behind an `Arc` for concurrent use.
pub struct CompletionRunner {
    backend: Arc<dyn ChatCompletionBackend>,
    model: String,
    tracer: Option<Arc<dyn Tracer>>,
}

impl CompletionRunner {
    pub fn new(backend: Arc<dyn ChatCompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            tracer: None,
        }
    }

    /// Records every `run` as a `pipeline` chain run and every completion
    /// call beneath it as an `llm` run.
    pub fn with_tracer(self, tracer: Arc<dyn Tracer>) -> Self {
        let backend = TracedBackend::new(self.backend, Arc::clone(&tracer));
        Self {
            backend: Arc::new(backend),
            model: self.model,
            tracer: Some(tracer),
        }
    }

    /// Builds an OpenAI-backed runner, traced to LangSmith when configured.
    ///
    /// Fails with [`CompletionError::Configuration`] when no credential is set,
    /// before any network call is attempted.
    pub fn from_settings(settings: &Settings) -> Result<Self, CompletionError> {
        let api_key = settings.api_key.as_ref().ok_or_else(|| {
            CompletionError::Configuration("OPENAI_API_KEY is not set".to_string())
        })?;

        let api_key = SecretString::from(api_key.expose_secret().to_string());
        let backend = OpenAIBackend::new(api_key, &settings.api_base)?;
        let runner = Self::new(Arc::new(backend), settings.model.clone());

        let Some(t) = &settings.tracing else {
            return Ok(runner);
        };
        let api_key = SecretString::from(t.api_key.expose_secret().to_string());
        match LangSmithTracer::new(t.endpoint.clone(), api_key, t.project.clone()) {
            Ok(tracer) => {
                debug!(endpoint = %t.endpoint, project = %t.project, "tracing enabled");
                Ok(runner.with_tracer(Arc::new(tracer)))
            }
            Err(e) => {
                warn!(error = %e, "tracing disabled");
                Ok(runner)
            }
        }
    }

    /// Sends `prompt` as a single user message and returns the generated text.
    pub async fn run(&self, prompt: &str) -> Result<String, CompletionError> {
        match &self.tracer {
            Some(tracer) => {
                let inputs = json!({ "user_input": prompt });
                let info = RunInfo::new(PIPELINE_RUN, RunType::Chain, inputs);
                traced(tracer.as_ref(), info, self.complete(prompt)).await
            }
            None => self.complete(prompt).await,
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let req = self.build_request(prompt)?;
        debug!(model = %self.model, "sending chat completion");

        let response = self.backend.chat_completion(req).await?;
        first_choice_text(response)
    }

    fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, CompletionError> {
        Ok(CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| {
                        CompletionError::RemoteService(format!("invalid request: {e}"))
                    })?,
            )],
            ..Default::default()
        })
    }
}

fn first_choice_text(response: CreateChatCompletionResponse) -> Result<String, CompletionError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        CompletionError::RemoteService("response contained no choices".to_string())
    })?;

    choice.message.content.ok_or_else(|| {
        CompletionError::RemoteService("first choice has no message content".to_string())
    })
}
