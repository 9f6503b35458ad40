//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be set via the
//! `-f` flag or `SKILLET_CONFIG`.
//!
//! ## Loading Priority
//!
//! Sources are merged in order, later sources overriding earlier ones:
//!
//! 1. **YAML config file** - base configuration
//! 2. **Environment variables** - `SKILLET_`-prefixed variables, with double
//!    underscores for nesting (`SKILLET_VALIDATION__MAX_RESPONSE_TIME_MS=60000`)
//!
//! ## Example
//!
//! ```bash
//! SKILLET_PORT=9000
//! SKILLET_PROJECT=recipe-telemetry-staging
//! SKILLET_ENABLE_OTEL_EXPORT=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::validation::DEFAULT_INTRO_PHRASES;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SKILLET_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Telemetry project the service reports into
    pub project: String,
    /// Telemetry entity (team or org) owning the project
    pub entity: Option<String>,
    /// Deployment environment tag attached to exported telemetry
    pub environment: String,
    /// Service version tag attached to exported telemetry
    pub service_version: String,
    /// Generation defaults recorded as telemetry resource attributes
    pub model_defaults: ModelDefaults,
    /// Enable the Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for traces and events
    pub enable_otel_export: bool,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Validation pipeline tunables
    pub validation: ValidationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            project: "recipe-telemetry".to_string(),
            entity: None,
            environment: "development".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            model_defaults: ModelDefaults::default(),
            enable_metrics: true,
            enable_otel_export: false,
            cors: CorsConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Defaults the recipe generator runs with, recorded on telemetry so
/// dashboards can correlate outcomes with generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDefaults {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// CORS configuration. A single `*` entry allows any origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Validation pipeline tunables.
///
/// The intro-phrase list is ordered: the first matching phrase is the one
/// reported back to the caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Conversational lead-ins rejected by the intro-text check
    pub intro_phrases: Vec<String>,
    /// Upper bound accepted for `responseTimeMs` on logged traces
    pub max_response_time_ms: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            intro_phrases: DEFAULT_INTRO_PHRASES.iter().map(|s| s.to_string()).collect(),
            max_response_time_ms: 300_000,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        Self::figment(args).extract()
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("SKILLET_").split("__"))
    }

    /// Sanity checks beyond what deserialization enforces.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.validation.max_response_time_ms < 0 {
            anyhow::bail!(
                "validation.max_response_time_ms ({}) cannot be negative",
                self.validation.max_response_time_ms
            );
        }
        if self.validation.intro_phrases.iter().any(|p| p.is_empty()) {
            anyhow::bail!("validation.intro_phrases cannot contain empty strings");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Entity reported by the health endpoint when none is configured.
    pub fn entity_or_default(&self) -> String {
        self.entity.clone().unwrap_or_else(|| "default".to_string())
    }
}
