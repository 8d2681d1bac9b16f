//! Startup configuration.
//!
//! [`Settings`] is read once from the environment (after an optional `.env`
//! file) and then passed explicitly to whatever needs it.

use secrecy::SecretString;
use tracing::{debug, warn};

use crate::trace::langsmith::{DEFAULT_ENDPOINT, DEFAULT_PROJECT};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug)]
pub struct Settings {
    /// `OPENAI_API_KEY`. Absence is reported when a runner is built.
    pub api_key: Option<SecretString>,
    pub api_base: String,
    pub model: String,
    /// Present only when tracing is enabled and a tracing key is set.
    pub tracing: Option<TracingSettings>,
}

#[derive(Debug)]
pub struct TracingSettings {
    pub api_key: SecretString,
    pub endpoint: String,
    pub project: String,
}

impl Settings {
    /// Loads `.env` from the working directory, if any, then reads the
    /// process environment.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded environment file"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable environment file"),
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(k));

        let tracing_key = first(&["LANGSMITH_API_KEY", "LANGCHAIN_API_KEY"]);
        let tracing_flag = first(&["LANGSMITH_TRACING", "LANGCHAIN_TRACING_V2"]);
        let tracing_on = tracing_flag.as_deref().is_none_or(is_truthy);

        let tracing = match tracing_key {
            Some(key) if tracing_on => Some(TracingSettings {
                api_key: SecretString::from(key),
                endpoint: first(&["LANGSMITH_ENDPOINT", "LANGCHAIN_ENDPOINT"])
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                project: first(&["LANGSMITH_PROJECT", "LANGCHAIN_PROJECT"])
                    .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            }),
            _ => None,
        };

        Self {
            api_key: get("OPENAI_API_KEY").map(SecretString::from),
            api_base: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tracing,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
