use std::sync::Arc;

use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};
use async_trait::async_trait;

use super::ChatCompletionBackend;
use crate::error::CompletionError;
use crate::trace::{RunInfo, RunType, Tracer, to_trace_value, traced};

const RUN_NAME: &str = "ChatOpenAI";

/// Middleware that records an `llm` run for every completion call.
///
/// The call is forwarded to the inner backend unchanged and its result is
/// returned unchanged; only the run record is added on the side.
pub struct TracedBackend<B> {
    inner: B,
    tracer: Arc<dyn Tracer>,
}

impl<B: ChatCompletionBackend> TracedBackend<B> {
    pub fn new(inner: B, tracer: Arc<dyn Tracer>) -> Self {
        Self { inner, tracer }
    }
}

#[async_trait]
impl<B: ChatCompletionBackend> ChatCompletionBackend for TracedBackend<B> {
    async fn chat_completion(
        &self,
        req: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, CompletionError> {
        let info = RunInfo::new(RUN_NAME, RunType::Llm, to_trace_value(&req, "inputs"))
            .with_metadata("ls_provider", "openai")
            .with_metadata("ls_model_name", req.model.clone());

        traced(self.tracer.as_ref(), info, self.inner.chat_completion(req)).await
    }
}
