//! Prometheus instruments for validation metrics.
//!
//! One instrument per dashboard panel: success rate over time, pass rate per
//! validation step, duration distribution, and error counts by category.

use prometheus::{Gauge, GaugeVec, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

use crate::metrics::AggregateMetrics;
use crate::validation::{Stage, ValidationOutcome};

/// Validation metric instruments, registered on a dedicated registry that is
/// merged into the `/internal/metrics` scrape output.
#[derive(Clone)]
pub struct ValidationMetrics {
    /// Success rate of the most recent batch
    success_rate: Gauge,
    /// Pass rate of the most recent batch, per validation step
    step_rate: GaugeVec,
    /// Mean validation duration of the most recent batch
    duration_mean_ms: Gauge,
    /// p95 validation duration of the most recent batch
    duration_p95_ms: Gauge,
    /// Per-call validation duration distribution
    duration_ms: Histogram,
    /// Failed validations by error category
    errors_total: IntCounterVec,
    /// All validations by result
    outcomes_total: IntCounterVec,
    registry: Registry,
}

impl ValidationMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let success_rate = Gauge::with_opts(Opts::new(
            "recipe_validation_success_rate",
            "Fraction of validations in the last batch that passed every check",
        ))?;
        registry.register(Box::new(success_rate.clone()))?;

        let step_rate = GaugeVec::new(
            Opts::new(
                "recipe_validation_step_rate",
                "Fraction of validations in the last batch that passed a given step",
            ),
            &["step"],
        )?;
        registry.register(Box::new(step_rate.clone()))?;

        let duration_mean_ms = Gauge::with_opts(Opts::new(
            "recipe_validation_duration_mean_ms",
            "Mean validation duration of the last batch in milliseconds",
        ))?;
        registry.register(Box::new(duration_mean_ms.clone()))?;

        let duration_p95_ms = Gauge::with_opts(Opts::new(
            "recipe_validation_duration_p95_ms",
            "95th percentile validation duration of the last batch in milliseconds",
        ))?;
        registry.register(Box::new(duration_p95_ms.clone()))?;

        // Validation is a handful of string scans plus one JSON parse, so the
        // buckets stay in the low-millisecond range.
        let duration_buckets = vec![0.5, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0];
        let duration_ms = Histogram::with_opts(
            HistogramOpts::new("recipe_validation_duration_ms", "Per-call validation duration in milliseconds")
                .buckets(duration_buckets),
        )?;
        registry.register(Box::new(duration_ms.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("recipe_validation_errors_total", "Failed validations by error category"),
            &["error_type"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let outcomes_total = IntCounterVec::new(
            Opts::new("recipe_validation_outcomes_total", "Validation calls by result"),
            &["result"],
        )?;
        registry.register(Box::new(outcomes_total.clone()))?;

        Ok(Self {
            success_rate,
            step_rate,
            duration_mean_ms,
            duration_p95_ms,
            duration_ms,
            errors_total,
            outcomes_total,
            registry: registry.clone(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one validation call.
    pub fn observe_outcome(&self, outcome: &ValidationOutcome) {
        self.duration_ms.observe(outcome.duration_ms as f64);
        let result = if outcome.success { "success" } else { "failure" };
        self.outcomes_total.with_label_values(&[result]).inc();
    }

    /// Record a batch summary. Error categories are touched even at zero so
    /// every known series exists on the first scrape.
    pub fn observe_snapshot(&self, metrics: &AggregateMetrics) {
        self.success_rate.set(metrics.success_rate);
        for stage in Stage::ALL {
            self.step_rate
                .with_label_values(&[stage.name()])
                .set(metrics.per_step_rate.get(stage));
        }
        self.duration_mean_ms.set(metrics.duration_mean_ms);
        self.duration_p95_ms.set(metrics.duration_p95_ms);
        for (kind, count) in &metrics.error_histogram {
            self.errors_total.with_label_values(&[kind.as_str()]).inc_by(*count);
        }
    }
}
