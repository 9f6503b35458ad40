//! Health endpoint response model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reported when the telemetry sink is ready to accept events.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Telemetry project the service reports into
    pub project: String,
    /// Telemetry entity owning the project
    pub entity: String,
}
