//! Health check handler.

use axum::{Json, extract::State};

use crate::AppState;
use crate::api::models::health::HealthResponse;
use crate::errors::{Error, Result};

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check",
    description = "Reports whether the telemetry backend is ready to accept events",
    responses(
        (status = 200, description = "Telemetry backend ready", body = HealthResponse),
        (status = 500, description = "Telemetry backend not ready"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    if !state.sink.is_ready() {
        return Err(Error::Internal {
            operation: "reach telemetry backend".to_string(),
        });
    }

    let backend = state.sink.backend();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        project: backend.project,
        entity: backend.entity,
    }))
}
