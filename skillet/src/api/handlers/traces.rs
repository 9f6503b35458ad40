//! HTTP handler for trace logging.

use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};

use crate::AppState;
use crate::api::models::traces::{LogTraceResponse, RecipeTrace};
use crate::errors::{Error, Result};
use crate::{sink, traces};

#[utoipa::path(
    post,
    path = "/log-trace",
    tag = "traces",
    summary = "Log a generation trace",
    description = "Derive metrics, artifacts, and metadata from a recipe-generation trace and forward them to telemetry",
    request_body = RecipeTrace,
    responses(
        (status = 200, description = "Trace recorded", body = LogTraceResponse),
        (status = 400, description = "A trace field is out of range"),
        (status = 500, description = "Trace could not be processed"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn log_trace(State(state): State<AppState>, Json(trace): Json<RecipeTrace>) -> Result<Json<LogTraceResponse>> {
    traces::validate_response_time(&trace, state.config.validation.max_response_time_ms)?;

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    match traces::build_trace_event(&trace, &timestamp) {
        Ok(event) => {
            state.sink.record_event(event);
            Ok(Json(LogTraceResponse {
                status: "success".to_string(),
                timestamp,
            }))
        }
        Err(e) => {
            // Internal faults get their own error event so the backend sees
            // them even though the client only receives a generic 500.
            sink::record_error(state.sink.as_ref(), "SerializationError", &e.to_string(), Some(&trace.trace_id));
            Err(Error::Internal {
                operation: "process trace".to_string(),
            })
        }
    }
}
