//! # skillet: Recipe Generation Telemetry Sidecar
//!
//! `skillet` is a small HTTP service that sits next to an AI recipe
//! generator. It receives the generator's raw output and end-to-end trace
//! records, runs candidate recipe JSON through a fixed validation pipeline,
//! and forwards structured outcomes, derived metrics, and artifacts to a
//! tracing/metrics backend.
//!
//! ## What It Does
//!
//! Clients post candidate recipe JSON to `/validate-json`. The
//! [`validation`] pipeline runs ordered checks (array shape, markdown
//! fences, conversational lead-ins, JSON parse, recipe structure) and
//! reports exactly how far the content got via a checkpoint map. Each
//! outcome is folded into summary statistics by the [`metrics`] aggregator
//! and forwarded through the telemetry [`sink`], so dashboards track success
//! rate, per-step pass rate, duration percentiles, and error categories over
//! time.
//!
//! Generation traces (prompt, response, timing, token counts, user feedback)
//! are posted to `/log-trace`, where the [`traces`] module derives a numeric
//! metrics projection, named text artifacts, and a categorical metadata map
//! before forwarding them.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum).
//! There is no database: each request is handled independently and
//! synchronously, and the only shared external resource is the telemetry
//! backend, reached through the injected [`sink::EventSink`] capability.
//! Structured logs flow through `tracing`; when OTLP export is enabled they
//! leave the process via OpenTelemetry. Prometheus instruments for the
//! validation dashboard are scraped at `/internal/metrics`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use skillet::{Application, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let args = skillet::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     skillet::telemetry::init_telemetry(&config)?;
//!
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     runtime.block_on(async {
//!         let app = Application::new(config)?;
//!         app.serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//!     })
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
mod openapi;
pub mod sink;
pub mod telemetry;
pub mod traces;
pub mod validation;

use axum::{
    Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::metrics::ValidationMetrics;
use crate::openapi::ApiDoc;
use crate::sink::{EventSink, TracingEventSink};
use crate::validation::Validator;

/// Application state shared across all request handlers.
///
/// Holds the injected telemetry sink, the configured validator, and the
/// optional Prometheus recorder. All fields are cheaply cloneable; the state
/// is cloned per request by axum.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub sink: Arc<dyn EventSink>,
    pub validator: Arc<Validator>,
    pub metrics_recorder: Option<ValidationMetrics>,
}

/// Create a CORS layer from configuration. A single `*` entry allows any
/// origin.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::permissive());
    }

    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        origins.push(origin.parse::<axum::http::HeaderValue>()?);
    }
    Ok(CorsLayer::new().allow_origin(origins))
}

/// Build the application router with all endpoints and middleware.
///
/// Initializes the Prometheus recorder on the state when metrics are enabled,
/// wires the three API routes plus the rendered API docs, and layers CORS and
/// request tracing on top.
#[instrument(skip_all)]
pub fn build_router(state: &mut AppState) -> anyhow::Result<Router> {
    if state.config.enable_metrics && state.metrics_recorder.is_none() {
        let registry = prometheus::Registry::new();
        let recorder =
            ValidationMetrics::new(&registry).map_err(|e| anyhow::anyhow!("Failed to create validation metrics: {}", e))?;
        state.metrics_recorder = Some(recorder);
    }

    let api_routes = Router::new()
        .route("/validate-json", post(api::handlers::validation::validate_json))
        .route("/log-trace", post(api::handlers::traces::log_trace))
        .route("/health", get(api::handlers::health::health_check))
        .with_state(state.clone());

    let mut router = Router::new()
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Expose HTTP-level and validation metrics on a single scrape endpoint.
    if let Some(recorder) = &state.metrics_recorder {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        let registry = recorder.registry().clone();

        router = router
            .route(
                "/internal/metrics",
                get(move || async move {
                    use prometheus::{Encoder, TextEncoder};

                    let mut output = metric_handle.render();

                    let encoder = TextEncoder::new();
                    let mut buffer = vec![];
                    if encoder.encode(&registry.gather(), &mut buffer).is_ok() {
                        output.push_str(&String::from_utf8_lossy(&buffer));
                    }
                    output
                }),
            )
            .layer(prometheus_layer);
    }

    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router, state, and lifecycle.
///
/// 1. **Create**: [`Application::new`] validates the configuration, builds
///    the telemetry sink and validator, and assembles the router.
/// 2. **Serve**: [`Application::serve`] binds the TCP port and handles
///    requests until the shutdown future resolves.
/// 3. **Shutdown**: the telemetry sink is flushed and closed exactly once.
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let sink: Arc<dyn EventSink> = Arc::new(TracingEventSink::new(config.project.clone(), config.entity_or_default()));
        let validator = Arc::new(Validator::from_config(&config.validation));

        let mut app_state = AppState::builder().config(config.clone()).sink(sink).validator(validator).build();
        let router = build_router(&mut app_state)?;

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    /// Start serving the application with graceful shutdown.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Recipe telemetry service listening on http://{}, reporting into project {:?}",
            bind_addr, self.config.project
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Flush pending telemetry before exit.
        info!("Shutting down telemetry...");
        self.app_state.sink.shutdown();

        Ok(())
    }
}
