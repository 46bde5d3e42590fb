//! Generation metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    /// Generations claimed and submitted.
    pub const GENERATIONS_STARTED_TOTAL: &str = "generation_started_total";

    /// Generations that ended, by outcome.
    pub const GENERATIONS_FINISHED_TOTAL: &str = "generation_finished_total";

    /// Wall-clock time from claim to outcome, by outcome.
    pub const GENERATION_DURATION_SECONDS: &str = "generation_duration_seconds";

    /// Status snapshots applied to state.
    pub const SNAPSHOTS_TOTAL: &str = "generation_snapshots_total";

    /// Library writes that failed and were skipped, by operation.
    pub const LIBRARY_SYNC_FAILURES_TOTAL: &str = "generation_library_sync_failures_total";
}

pub fn record_started() {
    counter!(names::GENERATIONS_STARTED_TOTAL).increment(1);
}

/// Record how a generation ended.
pub fn record_finished(outcome: &'static str, elapsed_secs: f64) {
    counter!(names::GENERATIONS_FINISHED_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, "outcome" => outcome).record(elapsed_secs);
}

pub fn record_snapshot() {
    counter!(names::SNAPSHOTS_TOTAL).increment(1);
}

pub fn record_library_failure(operation: &'static str) {
    counter!(names::LIBRARY_SYNC_FAILURES_TOTAL, "operation" => operation).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            names::GENERATIONS_STARTED_TOTAL,
            names::GENERATIONS_FINISHED_TOTAL,
            names::GENERATION_DURATION_SECONDS,
            names::SNAPSHOTS_TOTAL,
            names::LIBRARY_SYNC_FAILURES_TOTAL,
        ] {
            assert!(name.starts_with("generation_"));
        }
    }
}
