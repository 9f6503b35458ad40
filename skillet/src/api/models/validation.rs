//! Request and response models for JSON validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Candidate recipe JSON to validate, tagged with the generation session and
/// trace it came from.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateJsonRequest {
    /// Raw model output expected to be a JSON array of recipes
    pub content: String,
    pub session_id: String,
    pub trace_id: String,
    /// Free-form caller metadata, forwarded with the telemetry event
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, Value>,
}

/// Response for a candidate that passed every check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateJsonResponse {
    pub status: String,
    pub message: String,
}
