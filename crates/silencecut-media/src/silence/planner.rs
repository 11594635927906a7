//! Reconstruction planner: silence intervals to keep segments.

use silencecut_models::{validate_intervals, ConfigError, KeepPlan, KeepSegment, SilenceInterval};

use crate::error::MediaResult;

/// Invert `intervals` over `[0, total_duration]`.
///
/// Emits `(cursor, interval.start)` for every interval and a final
/// `(cursor, total_duration)`, so the plan always has `intervals.len() + 1`
/// segments. Zero-length segments are kept in place.
pub fn plan_keep_segments(total_duration: f64, intervals: &[SilenceInterval]) -> MediaResult<KeepPlan> {
    if !total_duration.is_finite() || total_duration < 0.0 {
        return Err(ConfigError::invalid_value("total_duration", total_duration.to_string()).into());
    }
    validate_intervals(intervals)?;

    let mut segments = Vec::with_capacity(intervals.len() + 1);
    let mut cursor = 0.0f64;

    for interval in intervals {
        // Offsets can push an interval past the last frame boundary
        let start = interval.start.min(total_duration);
        let end = interval.end.min(total_duration);

        segments.push(KeepSegment::new(cursor, start.max(cursor)));
        cursor = end.max(cursor);
    }
    segments.push(KeepSegment::new(cursor, total_duration));

    Ok(KeepPlan {
        segments,
        total_duration,
    })
}
