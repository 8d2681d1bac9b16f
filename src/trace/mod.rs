//! Call tracing.
//!
//! A [`Run`] is one traced call: its inputs, its outputs or error, and its
//! timing. [`traced`] wraps any fallible future in a run and hands the
//! finished record to a [`Tracer`]. Runs opened while another run is in
//! progress on the same task become its children, sharing the trace id and
//! extending its dotted order.
//!
//! Recording is best effort: a tracer failure is logged and the wrapped
//! call's result is returned unchanged.

use std::fmt::Display;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::error::TraceError;

pub mod langsmith;

pub use langsmith::LangSmithTracer;

tokio::task_local! {
    static CURRENT_RUN: RunContext;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Llm,
    Chain,
}

/// What to call a run and what went into it.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub name: String,
    pub run_type: RunType,
    pub inputs: Value,
    pub metadata: Map<String, Value>,
}

impl RunInfo {
    pub fn new(name: impl Into<String>, run_type: RunType, inputs: Value) -> Self {
        Self {
            name: name.into(),
            run_type,
            inputs,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A finished run, as handed to a [`Tracer`].
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub id: Uuid,
    pub trace_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
    pub dotted_order: String,
    pub name: String,
    pub run_type: RunType,
    pub inputs: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub extra: Value,
}

#[async_trait]
pub trait Tracer: Send + Sync {
    async fn record(&self, run: &Run) -> Result<(), TraceError>;
}

#[derive(Debug, Clone)]
struct RunContext {
    id: Uuid,
    trace_id: Uuid,
    parent_run_id: Option<Uuid>,
    dotted_order: String,
}

impl RunContext {
    fn open(parent: Option<&RunContext>, start_time: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let segment = format!("{}{}", start_time.format("%Y%m%dT%H%M%S%6fZ"), id);
        match parent {
            Some(parent) => Self {
                id,
                trace_id: parent.trace_id,
                parent_run_id: Some(parent.id),
                dotted_order: format!("{}.{}", parent.dotted_order, segment),
            },
            None => Self {
                id,
                trace_id: id,
                parent_run_id: None,
                dotted_order: segment,
            },
        }
    }
}

/// Runs `call` inside a new trace run and records the run once it settles.
///
/// The output of `call` is returned as is, whether or not recording succeeds.
pub async fn traced<F, T, E>(tracer: &dyn Tracer, info: RunInfo, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Serialize,
    E: Display,
{
    let start_time = Utc::now();
    let parent = CURRENT_RUN.try_with(RunContext::clone).ok();
    let context = RunContext::open(parent.as_ref(), start_time);

    let result = CURRENT_RUN.scope(context.clone(), call).await;

    let (outputs, error) = match &result {
        Ok(value) => (Some(wrap_outputs(to_trace_value(value, "outputs"))), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let run = Run {
        id: context.id,
        trace_id: context.trace_id,
        parent_run_id: context.parent_run_id,
        dotted_order: context.dotted_order,
        name: info.name,
        run_type: info.run_type,
        inputs: info.inputs,
        outputs,
        error,
        start_time,
        end_time: Utc::now(),
        extra: json!({ "metadata": info.metadata }),
    };

    if let Err(e) = tracer.record(&run).await {
        warn!(run = %run.name, error = %e, "failed to record trace run");
    }

    result
}

/// Serializes `value` for a run record, logging and substituting `null`
/// when it cannot be represented as JSON.
pub(crate) fn to_trace_value<T: Serialize + ?Sized>(value: &T, field: &str) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(field, error = %e, "trace field not serializable, recording null");
        Value::Null
    })
}

// Non-object outputs are keyed under "output" so every run carries a JSON object.
fn wrap_outputs(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => json!({ "output": other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collector {
        runs: Mutex<Vec<Run>>,
    }

    #[async_trait]
    impl Tracer for Collector {
        async fn record(&self, run: &Run) -> Result<(), TraceError> {
            self.runs.lock().unwrap().push(run.clone());
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Tracer for Unreachable {
        async fn record(&self, _run: &Run) -> Result<(), TraceError> {
            Err(TraceError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_root_run_records_output() {
        let collector = Collector::default();
        let info = RunInfo::new("pipeline", RunType::Chain, json!({ "user_input": "hi" }));

        let out: Result<String, String> =
            traced(&collector, info, async { Ok("hello".to_string()) }).await;
        assert_eq!(out.unwrap(), "hello");

        let runs = collector.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.trace_id, run.id);
        assert!(run.parent_run_id.is_none());
        assert!(run.dotted_order.ends_with(&run.id.to_string()));
        assert_eq!(run.outputs, Some(json!({ "output": "hello" })));
        assert!(run.error.is_none());
        assert!(run.end_time >= run.start_time);
    }

    #[tokio::test]
    async fn test_nested_run_is_child() {
        let collector = Collector::default();
        let outer = RunInfo::new("pipeline", RunType::Chain, json!({}));

        let out: Result<u32, String> = traced(&collector, outer, async {
            let inner = RunInfo::new("ChatOpenAI", RunType::Llm, json!({}))
                .with_metadata("ls_provider", "openai");
            traced(&collector, inner, async { Ok::<u32, String>(7) }).await
        })
        .await;
        assert_eq!(out.unwrap(), 7);

        let runs = collector.runs.lock().unwrap();
        let (child, parent) = (&runs[0], &runs[1]);
        assert_eq!(child.name, "ChatOpenAI");
        assert_eq!(child.parent_run_id, Some(parent.id));
        assert_eq!(child.trace_id, parent.id);
        assert!(child.dotted_order.starts_with(&format!("{}.", parent.dotted_order)));
        assert_eq!(child.extra["metadata"]["ls_provider"], "openai");
    }

    #[tokio::test]
    async fn test_error_is_recorded_and_returned() {
        let collector = Collector::default();
        let info = RunInfo::new("pipeline", RunType::Chain, json!({}));

        let out: Result<String, String> =
            traced(&collector, info, async { Err("no choices".to_string()) }).await;
        assert_eq!(out.unwrap_err(), "no choices");

        let runs = collector.runs.lock().unwrap();
        assert_eq!(runs[0].error.as_deref(), Some("no choices"));
        assert!(runs[0].outputs.is_none());
    }

    #[tokio::test]
    async fn test_tracer_failure_does_not_change_result() {
        let info = RunInfo::new("pipeline", RunType::Chain, json!({}));
        let out: Result<String, String> =
            traced(&Unreachable, info, async { Ok("fine".to_string()) }).await;
        assert_eq!(out.unwrap(), "fine");
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    #[tokio::test]
    async fn test_unserializable_output_records_null() {
        let collector = Collector::default();
        let info = RunInfo::new("pipeline", RunType::Chain, json!({}));

        let out: Result<Unserializable, String> =
            traced(&collector, info, async { Ok(Unserializable) }).await;
        assert!(out.is_ok());

        let runs = collector.runs.lock().unwrap();
        assert_eq!(runs[0].outputs, Some(json!({ "output": null })));
    }

    #[test]
    fn test_object_outputs_are_kept() {
        let value = json!({ "choices": [] });
        assert_eq!(wrap_outputs(value.clone()), value);
    }
}
