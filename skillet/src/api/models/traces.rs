//! Request and response models for trace logging.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Scores and notes produced by the automatic evaluation pass over a
/// generated response. Each category holds a free-form score/notes mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AutoEvaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub grammar: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub hallucination: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub coherence: Option<Value>,
}

impl AutoEvaluation {
    pub fn is_empty(&self) -> bool {
        self.grammar.is_none() && self.hallucination.is_none() && self.coherence.is_none()
    }
}

/// One end-to-end record of a recipe-generation request/response pair.
///
/// Field names follow the client's camelCase wire format, except the sampling
/// parameters (`top_p`, `frequency_penalty`, `presence_penalty`) which the
/// clients send snake_case as the upstream APIs do.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeTrace {
    pub session_id: String,
    pub trace_id: String,
    pub prompt: String,
    #[serde(default)]
    pub prompt_url: Option<String>,
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub response_url: Option<String>,
    pub temperature: f64,
    #[serde(default)]
    pub postprocessed: Option<String>,
    #[serde(default)]
    pub prompt_tokens: Option<i64>,
    #[serde(default)]
    pub completion_tokens: Option<i64>,
    #[serde(default)]
    pub total_tokens: Option<i64>,
    pub response_time_ms: i64,
    #[serde(default)]
    pub retry_count: Option<i64>,
    #[serde(default)]
    pub auto_eval: Option<AutoEvaluation>,
    /// Caller-supplied free-form metadata, merged into the derived metadata
    /// with caller keys winning on conflict
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_feedback: Option<String>,
    #[serde(default)]
    pub error_tags: Vec<String>,
    #[serde(default)]
    pub response_type: Vec<String>,
    #[serde(default, rename = "top_p")]
    pub top_p: Option<f64>,
    #[serde(default, rename = "frequency_penalty")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, rename = "presence_penalty")]
    pub presence_penalty: Option<f64>,
}

/// Response for a successfully logged trace.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogTraceResponse {
    pub status: String,
    /// RFC 3339 timestamp of when the trace was recorded
    pub timestamp: String,
}
