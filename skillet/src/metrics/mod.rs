//! Validation metrics: batch aggregation and Prometheus instruments.
//!
//! [`aggregate`] is the pure computation: it folds a batch of validation
//! outcomes into summary statistics. [`ValidationMetrics`] is the charting
//! side: Prometheus instruments fed from those summaries, scraped at
//! `/internal/metrics` alongside the axum-prometheus HTTP metrics.

mod aggregate;
mod charts;

pub use aggregate::{AggregateMetrics, EmptyBatchError, StepRates, aggregate};
pub use charts::ValidationMetrics;
