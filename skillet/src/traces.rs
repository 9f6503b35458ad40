//! Derivation of telemetry records from recipe-generation traces.
//!
//! A thin mapping layer: one inbound [`RecipeTrace`] becomes one telemetry
//! event holding a numeric metrics projection, named text artifacts, and a
//! categorical metadata map. No state, no I/O; forwarding the event is the
//! handler's job.

use serde_json::{Map, Value, json};

use crate::api::models::traces::RecipeTrace;
use crate::errors::Error;
use crate::sink::TelemetryEvent;

/// Reject traces whose response time is negative or implausibly large.
pub fn validate_response_time(trace: &RecipeTrace, max_response_time_ms: i64) -> Result<(), Error> {
    if trace.response_time_ms < 0 || trace.response_time_ms > max_response_time_ms {
        return Err(Error::Range {
            field: "responseTimeMs",
            value: trace.response_time_ms,
            min: 0,
            max: max_response_time_ms,
        });
    }
    Ok(())
}

/// Numeric-only projection of a trace. `None`-valued fields are dropped
/// rather than logged as nulls.
pub fn derive_metrics(trace: &RecipeTrace) -> Map<String, Value> {
    let mut metrics = Map::new();
    metrics.insert("response_time_ms".to_string(), json!(trace.response_time_ms));
    if let Some(v) = trace.prompt_tokens {
        metrics.insert("prompt_tokens".to_string(), json!(v));
    }
    if let Some(v) = trace.completion_tokens {
        metrics.insert("completion_tokens".to_string(), json!(v));
    }
    if let Some(v) = trace.total_tokens {
        metrics.insert("total_tokens".to_string(), json!(v));
    }
    metrics.insert("retry_count".to_string(), json!(trace.retry_count.unwrap_or(0)));
    if let Some(v) = trace.rating {
        metrics.insert("rating".to_string(), json!(v));
    }
    metrics.insert("temperature".to_string(), json!(trace.temperature));
    metrics.insert("prompt_length".to_string(), json!(trace.prompt.len()));
    metrics.insert("response_length".to_string(), json!(trace.response.len()));
    metrics.insert("has_error".to_string(), json!(!trace.error_tags.is_empty()));
    metrics
}

/// Named text blobs worth keeping verbatim: the prompt/response pair plus
/// stringified side data. Absent fields are skipped.
pub fn derive_artifacts(trace: &RecipeTrace) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
    let mut artifacts = vec![("prompt", trace.prompt.clone()), ("response", trace.response.clone())];
    if let Some(postprocessed) = &trace.postprocessed {
        artifacts.push(("postprocessed", postprocessed.clone()));
    }
    if let Some(metadata) = &trace.metadata {
        artifacts.push(("metadata", serde_json::to_string(metadata)?));
    }
    if let Some(auto_eval) = &trace.auto_eval {
        artifacts.push(("auto_eval", serde_json::to_string(auto_eval)?));
    }
    if !trace.response_type.is_empty() {
        artifacts.push(("response_type", serde_json::to_string(&trace.response_type)?));
    }
    Ok(artifacts)
}

/// Categorical and identifying fields, merged with any caller-supplied
/// metadata. Caller keys take precedence on conflict.
pub fn derive_metadata(trace: &RecipeTrace) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("model".to_string(), json!(trace.model));
    metadata.insert("session_id".to_string(), json!(trace.session_id));
    metadata.insert("trace_id".to_string(), json!(trace.trace_id));
    metadata.insert("prompt_url".to_string(), json!(trace.prompt_url));
    metadata.insert("response_url".to_string(), json!(trace.response_url));
    metadata.insert("response_type".to_string(), json!(trace.response_type));
    metadata.insert("error_tags".to_string(), json!(trace.error_tags));
    metadata.insert("user_feedback".to_string(), json!(trace.user_feedback));
    metadata.insert("rating".to_string(), json!(trace.rating));

    if let Some(auto_eval) = &trace.auto_eval
        && !auto_eval.is_empty()
    {
        metadata.insert("auto_eval".to_string(), json!(auto_eval));
    }

    if let Some(caller) = &trace.metadata {
        for (key, value) in caller {
            metadata.insert(key.clone(), value.clone());
        }
    }

    metadata
}

/// Assemble the full telemetry event for one trace.
pub fn build_trace_event(trace: &RecipeTrace, timestamp: &str) -> Result<TelemetryEvent, serde_json::Error> {
    let artifacts: Vec<Value> = derive_artifacts(trace)?
        .into_iter()
        .map(|(category, value)| json!({ "category": category, "value": value }))
        .collect();

    Ok(TelemetryEvent {
        name: "log-trace",
        session_id: Some(trace.session_id.clone()),
        trace_id: Some(trace.trace_id.clone()),
        payload: json!({
            "metrics": Value::Object(derive_metrics(trace)),
            "artifacts": artifacts,
            "metadata": Value::Object(derive_metadata(trace)),
            "timestamp": timestamp,
            "session_group": trace.session_id,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_trace() -> RecipeTrace {
        serde_json::from_value(json!({
            "sessionId": "session-1",
            "traceId": "trace-1",
            "prompt": "Give me three soup recipes",
            "model": "gpt-4o-mini",
            "response": "[]",
            "temperature": 0.7,
            "responseTimeMs": 1200
        }))
        .expect("valid base trace")
    }

    #[test]
    fn response_time_bounds_are_inclusive() {
        let mut trace = base_trace();

        trace.response_time_ms = 0;
        assert!(validate_response_time(&trace, 300_000).is_ok());
        trace.response_time_ms = 300_000;
        assert!(validate_response_time(&trace, 300_000).is_ok());

        trace.response_time_ms = -1;
        assert!(validate_response_time(&trace, 300_000).is_err());
        trace.response_time_ms = 300_001;
        let err = validate_response_time(&trace, 300_000).unwrap_err();
        assert!(err.to_string().contains("responseTimeMs"));
    }

    #[test]
    fn metrics_drop_absent_fields() {
        let trace = base_trace();

        let metrics = derive_metrics(&trace);

        assert_eq!(metrics["response_time_ms"], json!(1200));
        assert_eq!(metrics["retry_count"], json!(0));
        assert_eq!(metrics["prompt_length"], json!("Give me three soup recipes".len()));
        assert_eq!(metrics["has_error"], json!(false));
        assert!(!metrics.contains_key("prompt_tokens"));
        assert!(!metrics.contains_key("rating"));
    }

    #[test]
    fn metrics_include_token_counts_when_present() {
        let mut trace = base_trace();
        trace.prompt_tokens = Some(150);
        trace.completion_tokens = Some(420);
        trace.total_tokens = Some(570);
        trace.error_tags = vec!["truncated".to_string()];

        let metrics = derive_metrics(&trace);

        assert_eq!(metrics["prompt_tokens"], json!(150));
        assert_eq!(metrics["total_tokens"], json!(570));
        assert_eq!(metrics["has_error"], json!(true));
    }

    #[test]
    fn artifacts_skip_absent_fields() {
        let trace = base_trace();

        let artifacts = derive_artifacts(&trace).unwrap();

        let names: Vec<&str> = artifacts.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["prompt", "response"]);
    }

    #[test]
    fn artifacts_stringify_side_data() {
        let mut trace = base_trace();
        trace.postprocessed = Some("[]".to_string());
        trace.response_type = vec!["json".to_string()];
        trace.metadata = Some(serde_json::from_value(json!({"cuisine": "thai"})).unwrap());

        let artifacts = derive_artifacts(&trace).unwrap();

        let find = |name: &str| artifacts.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str());
        assert_eq!(find("postprocessed"), Some("[]"));
        assert_eq!(find("response_type"), Some(r#"["json"]"#));
        assert_eq!(find("metadata"), Some(r#"{"cuisine":"thai"}"#));
    }

    #[test]
    fn caller_metadata_wins_on_conflict() {
        let mut trace = base_trace();
        trace.metadata = Some(serde_json::from_value(json!({"model": "overridden", "custom": 42})).unwrap());

        let metadata = derive_metadata(&trace);

        assert_eq!(metadata["model"], json!("overridden"));
        assert_eq!(metadata["custom"], json!(42));
        assert_eq!(metadata["session_id"], json!("session-1"));
    }

    #[test]
    fn empty_auto_eval_is_not_recorded() {
        let mut trace = base_trace();
        trace.auto_eval = Some(Default::default());

        assert!(!derive_metadata(&trace).contains_key("auto_eval"));

        trace.auto_eval = Some(serde_json::from_value(json!({"grammar": {"score": 0.9}})).unwrap());
        assert_eq!(derive_metadata(&trace)["auto_eval"], json!({"grammar": {"score": 0.9}}));
    }

    #[test]
    fn trace_event_carries_ids_and_session_group() {
        let trace = base_trace();

        let event = build_trace_event(&trace, "2026-08-23T12:00:00Z").unwrap();

        assert_eq!(event.name, "log-trace");
        assert_eq!(event.session_id.as_deref(), Some("session-1"));
        assert_eq!(event.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(event.payload["session_group"], json!("session-1"));
        assert_eq!(event.payload["timestamp"], json!("2026-08-23T12:00:00Z"));
        assert!(event.payload["metrics"].is_object());
        assert!(event.payload["artifacts"].is_array());
    }
}
