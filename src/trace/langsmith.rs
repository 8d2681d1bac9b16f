//! LangSmith exporter.
//!
//! Posts each finished [`Run`] to the LangSmith run ingestion endpoint
//! (`POST {endpoint}/runs`), tagged with the configured project.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::{Run, Tracer};
use crate::error::TraceError;

pub const DEFAULT_ENDPOINT: &str = "https://api.smith.langchain.com";
pub const DEFAULT_PROJECT: &str = "default";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LangSmithTracer {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    project: String,
}

impl LangSmithTracer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        project: impl Into<String>,
    ) -> Result<Self, TraceError> {
        let endpoint: String = endpoint.into();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TraceError::Transport(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            project: project.into(),
        })
    }

    fn runs_url(&self) -> String {
        format!("{}/runs", self.endpoint)
    }
}

#[derive(Serialize)]
struct RunPayload<'a> {
    #[serde(flatten)]
    run: &'a Run,
    session_name: &'a str,
}

#[async_trait]
impl Tracer for LangSmithTracer {
    async fn record(&self, run: &Run) -> Result<(), TraceError> {
        let payload = RunPayload {
            run,
            session_name: &self.project,
        };

        let response = self
            .client
            .post(self.runs_url())
            .header("x-api-key", self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| TraceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TraceError::Rejected { status, body });
        }

        debug!(run_id = %run.id, name = %run.name, "trace run recorded");
        Ok(())
    }
}
