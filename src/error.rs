use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),
}

/// Failure to deliver a trace run. Never surfaces through [`CompletionError`].
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Trace transport error: {0}")]
    Transport(String),

    #[error("Trace collector rejected run: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
