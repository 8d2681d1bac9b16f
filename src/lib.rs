pub mod backend;
pub mod config;
pub mod error;
pub mod runner;
pub mod trace;

pub use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};
pub use backend::ChatCompletionBackend;
pub use backend::openai::OpenAIBackend;
pub use backend::traced::TracedBackend;
pub use config::{Settings, TracingSettings};
pub use error::{CompletionError, TraceError};
pub use runner::CompletionRunner;
pub use trace::{LangSmithTracer, Run, RunInfo, RunType, Tracer, traced};
