//! Metrics recorded by detection and materialization.
//!
//! Uses the `metrics` facade; nothing is exported unless the embedding
//! application installs a recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const DETECTION_RUNS_TOTAL: &str = "silencecut_detection_runs_total";
    pub const SILENCE_INTERVALS_TOTAL: &str = "silencecut_silence_intervals_total";
    pub const MATERIALIZE_RUNS_TOTAL: &str = "silencecut_materialize_runs_total";
    pub const MATERIALIZE_FAILURES_TOTAL: &str = "silencecut_materialize_failures_total";
    pub const SEGMENTS_ENCODED_TOTAL: &str = "silencecut_segments_encoded_total";
    pub const SEGMENT_ENCODE_SECONDS: &str = "silencecut_segment_encode_seconds";
}

/// Record a finished detection run.
pub fn record_detection(intervals: usize) {
    counter!(names::DETECTION_RUNS_TOTAL).increment(1);
    counter!(names::SILENCE_INTERVALS_TOTAL).increment(intervals as u64);
}

/// Record one re-encoded keep segment.
pub fn record_segment_encoded(duration_secs: f64) {
    counter!(names::SEGMENTS_ENCODED_TOTAL).increment(1);
    histogram!(names::SEGMENT_ENCODE_SECONDS).record(duration_secs);
}

/// Record the outcome of a materialization run.
pub fn record_materialize(strategy: &str, success: bool) {
    let labels = [("strategy", strategy.to_string())];
    counter!(names::MATERIALIZE_RUNS_TOTAL, &labels).increment(1);
    if !success {
        counter!(names::MATERIALIZE_FAILURES_TOTAL, &labels).increment(1);
    }
}
