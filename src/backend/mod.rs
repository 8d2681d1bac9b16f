use std::sync::Arc;

use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};
use async_trait::async_trait;

use crate::error::CompletionError;

pub mod openai;
pub mod traced;

#[async_trait]
pub trait ChatCompletionBackend: Send + Sync {
    async fn chat_completion(
        &self,
        req: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, CompletionError>;
}

#[async_trait]
impl<B: ChatCompletionBackend + ?Sized> ChatCompletionBackend for Arc<B> {
    async fn chat_completion(
        &self,
        req: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, CompletionError> {
        self.as_ref().chat_completion(req).await
    }
}
