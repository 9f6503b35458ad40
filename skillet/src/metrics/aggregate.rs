//! Batch aggregation of validation outcomes.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::validation::{ErrorKind, Stage, ValidationOutcome};

/// Aggregation over zero outcomes has no meaningful rates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot aggregate an empty batch of validation outcomes")]
pub struct EmptyBatchError;

/// Pass rate per validation stage, in stage order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepRates {
    pub array_format: f64,
    pub markdown_removed: f64,
    pub intro_text_removed: f64,
    pub json_parsed: f64,
    pub structure_validated: f64,
}

impl StepRates {
    pub fn get(&self, stage: Stage) -> f64 {
        match stage {
            Stage::ArrayFormat => self.array_format,
            Stage::MarkdownRemoved => self.markdown_removed,
            Stage::IntroTextRemoved => self.intro_text_removed,
            Stage::JsonParsed => self.json_parsed,
            Stage::StructureValidated => self.structure_validated,
        }
    }

    fn set(&mut self, stage: Stage, rate: f64) {
        match stage {
            Stage::ArrayFormat => self.array_format = rate,
            Stage::MarkdownRemoved => self.markdown_removed = rate,
            Stage::IntroTextRemoved => self.intro_text_removed = rate,
            Stage::JsonParsed => self.json_parsed = rate,
            Stage::StructureValidated => self.structure_validated = rate,
        }
    }
}

/// Summary statistics over one batch of validation outcomes.
///
/// Ephemeral: computed per batch and handed straight to the telemetry sink
/// and the Prometheus instruments, never accumulated across batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    /// Fraction of outcomes with `success == true`, in `[0, 1]`
    pub success_rate: f64,
    /// Fraction of outcomes that passed each stage, in `[0, 1]`
    pub per_step_rate: StepRates,
    pub duration_mean_ms: f64,
    pub duration_p95_ms: f64,
    /// Error counts by category. Always contains every kind from the known
    /// reference set, with zero counts where the batch produced none, so the
    /// consuming dashboard shows all categories.
    pub error_histogram: BTreeMap<ErrorKind, u64>,
}

/// Fold a batch of outcomes into summary statistics.
///
/// `known_kinds` is the reference set of error categories seeded into the
/// histogram at zero; categories found on outcomes are counted on top of it.
pub fn aggregate(outcomes: &[ValidationOutcome], known_kinds: &[ErrorKind]) -> Result<AggregateMetrics, EmptyBatchError> {
    if outcomes.is_empty() {
        return Err(EmptyBatchError);
    }
    let n = outcomes.len() as f64;

    let success_rate = outcomes.iter().filter(|o| o.success).count() as f64 / n;

    let mut per_step_rate = StepRates::default();
    for stage in Stage::ALL {
        let passed = outcomes.iter().filter(|o| o.steps.get(stage)).count() as f64;
        per_step_rate.set(stage, passed / n);
    }

    let mut durations: Vec<u64> = outcomes.iter().map(|o| o.duration_ms).collect();
    durations.sort_unstable();
    let duration_mean_ms = durations.iter().sum::<u64>() as f64 / n;
    let duration_p95_ms = percentile(&durations, 0.95);

    let mut error_histogram: BTreeMap<ErrorKind, u64> = known_kinds.iter().map(|kind| (*kind, 0)).collect();
    for outcome in outcomes.iter().filter(|o| !o.success) {
        if let Some(kind) = outcome.error_kind {
            *error_histogram.entry(kind).or_insert(0) += 1;
        }
    }

    Ok(AggregateMetrics {
        success_rate,
        per_step_rate,
        duration_mean_ms,
        duration_p95_ms,
        error_histogram,
    })
}

/// Linear-interpolation percentile over an already-sorted slice.
fn percentile(sorted: &[u64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] as f64 + (sorted[hi] - sorted[lo]) as f64 * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validator;

    const VALID: &str = r#"[{"name":"Soup","prepTime":5,"cookTime":10,"totalTime":15,"ingredients":[],"steps":[]}]"#;

    fn outcomes(contents: &[&str]) -> Vec<ValidationOutcome> {
        let validator = Validator::default();
        contents.iter().map(|c| validator.validate(c, "session", "trace")).collect()
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(aggregate(&[], &ErrorKind::KNOWN), Err(EmptyBatchError));
    }

    #[test]
    fn success_rate_is_mean_of_success_flags() {
        let batch = outcomes(&[VALID, "not json", VALID, "[]"]);

        let metrics = aggregate(&batch, &ErrorKind::KNOWN).unwrap();

        assert_eq!(metrics.success_rate, 0.5);
    }

    #[test]
    fn success_rate_stays_within_unit_interval() {
        let all_good = aggregate(&outcomes(&[VALID, VALID]), &ErrorKind::KNOWN).unwrap();
        let all_bad = aggregate(&outcomes(&["nope", "nope"]), &ErrorKind::KNOWN).unwrap();

        assert_eq!(all_good.success_rate, 1.0);
        assert_eq!(all_bad.success_rate, 0.0);
    }

    #[test]
    fn per_step_rates_follow_checkpoint_progress() {
        // One full pass, one bracket failure, one structure failure.
        let batch = outcomes(&[VALID, "plain text", "[]"]);

        let metrics = aggregate(&batch, &ErrorKind::KNOWN).unwrap();

        let third = 1.0 / 3.0;
        assert!((metrics.per_step_rate.array_format - 2.0 * third).abs() < 1e-9);
        assert!((metrics.per_step_rate.json_parsed - 2.0 * third).abs() < 1e-9);
        assert!((metrics.per_step_rate.structure_validated - third).abs() < 1e-9);
        for stage in Stage::ALL {
            let rate = metrics.per_step_rate.get(stage);
            assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn error_histogram_counts_failures_and_seeds_known_kinds() {
        let batch = outcomes(&[VALID, "plain text", "{}", "[{\"name\": \"Soup\",}]"]);

        let metrics = aggregate(&batch, &ErrorKind::KNOWN).unwrap();

        assert_eq!(metrics.error_histogram[&ErrorKind::Format], 2);
        assert_eq!(metrics.error_histogram[&ErrorKind::Parse], 1);
        // No structure or range errors in the batch, but the categories are
        // still present at zero.
        assert_eq!(metrics.error_histogram[&ErrorKind::Structure], 0);
        assert_eq!(metrics.error_histogram[&ErrorKind::Range], 0);
    }

    #[test]
    fn error_histogram_only_counts_failed_outcomes() {
        let batch = outcomes(&[VALID, VALID]);

        let metrics = aggregate(&batch, &ErrorKind::KNOWN).unwrap();

        assert!(metrics.error_histogram.values().all(|&count| count == 0));
    }

    #[test]
    fn duration_statistics_over_synthetic_batch() {
        let mut batch = outcomes(&[VALID; 5]);
        for (outcome, ms) in batch.iter_mut().zip([10, 20, 30, 40, 100]) {
            outcome.duration_ms = ms;
        }

        let metrics = aggregate(&batch, &ErrorKind::KNOWN).unwrap();

        assert_eq!(metrics.duration_mean_ms, 40.0);
        // rank 0.95 * 4 = 3.8 -> between 40 and 100
        assert!((metrics.duration_p95_ms - 88.0).abs() < 1e-9);
    }

    #[test]
    fn single_outcome_batch_uses_its_own_duration() {
        let mut batch = outcomes(&[VALID]);
        batch[0].duration_ms = 7;

        let metrics = aggregate(&batch, &ErrorKind::KNOWN).unwrap();

        assert_eq!(metrics.duration_mean_ms, 7.0);
        assert_eq!(metrics.duration_p95_ms, 7.0);
    }

    #[test]
    fn histogram_reference_set_is_substitutable() {
        let batch = outcomes(&["plain text"]);

        let metrics = aggregate(&batch, &[ErrorKind::Parse]).unwrap();

        // Only the provided reference kind is seeded; the observed kind is
        // still counted.
        assert_eq!(metrics.error_histogram[&ErrorKind::Parse], 0);
        assert_eq!(metrics.error_histogram[&ErrorKind::Format], 1);
        assert!(!metrics.error_histogram.contains_key(&ErrorKind::Structure));
    }
}
