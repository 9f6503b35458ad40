//! OpenAPI documentation for the service API, rendered at `/docs`.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::models::{health, traces, validation};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recipe Telemetry API",
        description = "Validates AI-generated recipe JSON and forwards generation traces and derived metrics to a telemetry backend"
    ),
    paths(
        handlers::validation::validate_json,
        handlers::traces::log_trace,
        handlers::health::health_check,
    ),
    components(schemas(
        validation::ValidateJsonRequest,
        validation::ValidateJsonResponse,
        traces::RecipeTrace,
        traces::AutoEvaluation,
        traces::LogTraceResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "validation", description = "Recipe JSON validation"),
        (name = "traces", description = "Generation trace logging"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;
