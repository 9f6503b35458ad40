//! HTTP handler for recipe JSON validation.

use axum::{Json, extract::State};
use serde_json::Value;

use crate::AppState;
use crate::api::models::validation::{ValidateJsonRequest, ValidateJsonResponse};
use crate::errors::{Error, Result};
use crate::metrics::aggregate;
use crate::sink::TelemetryEvent;
use crate::validation::ErrorKind;

#[utoipa::path(
    post,
    path = "/validate-json",
    tag = "validation",
    summary = "Validate recipe JSON",
    description = "Run candidate recipe JSON through the validation pipeline and forward the outcome to telemetry",
    request_body = ValidateJsonRequest,
    responses(
        (status = 200, description = "Content passed every check", body = ValidateJsonResponse),
        (status = 400, description = "A validation check failed; the body names the check"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn validate_json(
    State(state): State<AppState>,
    Json(request): Json<ValidateJsonRequest>,
) -> Result<Json<ValidateJsonResponse>> {
    let outcome = state
        .validator
        .validate(&request.content, &request.session_id, &request.trace_id);

    if let Some(metrics) = &state.metrics_recorder {
        metrics.observe_outcome(&outcome);
    }

    // Refresh the dashboard with a one-record batch. Failed outcomes are
    // forwarded too; the dashboard needs the error categories.
    let snapshot = aggregate(std::slice::from_ref(&outcome), &ErrorKind::KNOWN)?;
    if let Some(metrics) = &state.metrics_recorder {
        metrics.observe_snapshot(&snapshot);
    }
    state.sink.record_event(TelemetryEvent {
        name: "validation-metrics",
        session_id: Some(request.session_id.clone()),
        trace_id: Some(request.trace_id.clone()),
        payload: serde_json::to_value(&snapshot).map_err(anyhow::Error::from)?,
    });

    let mut payload = serde_json::to_value(&outcome).map_err(anyhow::Error::from)?;
    if !request.metadata.is_empty() {
        payload["metadata"] = Value::Object(request.metadata.clone());
    }
    state.sink.record_event(TelemetryEvent {
        name: "validate-json",
        session_id: Some(request.session_id.clone()),
        trace_id: Some(request.trace_id.clone()),
        payload,
    });

    match (outcome.error_kind, outcome.error_message) {
        (Some(kind), Some(message)) => Err(Error::Validation { kind, message }),
        _ => Ok(Json(ValidateJsonResponse {
            status: "success".to_string(),
            message: "JSON validation passed".to_string(),
        })),
    }
}
