//! Time-coded results of detection and planning.
//!
//! All times are seconds in source-file coordinates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionConfig;
use crate::error::ConfigError;

/// Energy of one analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnergyFrame {
    /// Frame index; the frame covers samples `[index * hop, index * hop + frame_length)`.
    pub index: usize,
    /// Root-mean-square amplitude of the window.
    pub energy: f32,
}

/// A time range classified as silence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: f64,
}

impl SilenceInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// A time range that survives trimming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeepSegment {
    pub start: f64,
    pub end: f64,
}

impl KeepSegment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Zero-length segments carry nothing and are skipped when materializing.
    pub fn is_degenerate(&self) -> bool {
        self.end <= self.start
    }
}

/// Output of one detection run.
///
/// A new run replaces the previous result wholesale; results are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionResult {
    /// Ordered, non-overlapping silence intervals.
    pub intervals: Vec<SilenceInterval>,
    /// Duration of the analysed source in seconds.
    pub total_duration: f64,
    /// Configuration the run used.
    pub config: DetectionConfig,
}

impl DetectionResult {
    /// Number of detected silence gaps.
    pub fn count(&self) -> usize {
        self.intervals.len()
    }

    /// True when no silence was found. This is a valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Total seconds covered by silence intervals.
    pub fn silence_secs(&self) -> f64 {
        self.intervals.iter().map(SilenceInterval::duration).sum()
    }
}

/// Check that intervals are well formed, sorted and mutually non-overlapping.
pub fn validate_intervals(intervals: &[SilenceInterval]) -> Result<(), ConfigError> {
    let mut previous_end = 0.0_f64;
    for (index, interval) in intervals.iter().enumerate() {
        let well_formed = interval.start.is_finite()
            && interval.end.is_finite()
            && interval.start >= 0.0
            && interval.start <= interval.end;
        if !well_formed {
            return Err(ConfigError::InvalidInterval {
                index,
                start: interval.start,
                end: interval.end,
            });
        }
        if interval.start < previous_end {
            return Err(ConfigError::OverlappingIntervals { index });
        }
        previous_end = interval.end;
    }
    Ok(())
}

/// Ordered keep segments covering everything outside the silence intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeepPlan {
    /// Segments in source order, including degenerate ones.
    pub segments: Vec<KeepSegment>,
    /// Duration of the source in seconds.
    pub total_duration: f64,
}

impl KeepPlan {
    /// Segments that actually carry content.
    pub fn non_degenerate(&self) -> impl Iterator<Item = (usize, &KeepSegment)> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| !segment.is_degenerate())
    }

    /// Seconds that survive trimming.
    pub fn kept_secs(&self) -> f64 {
        self.segments.iter().map(KeepSegment::duration).sum()
    }

    /// Summary statistics for logging and reports.
    pub fn stats(&self) -> PlanStats {
        let kept_secs = self.kept_secs();
        let keep_count = self.non_degenerate().count();
        let removed_secs = (self.total_duration - kept_secs).max(0.0);
        let keep_ratio = if self.total_duration > 0.0 {
            kept_secs / self.total_duration
        } else {
            1.0
        };

        PlanStats {
            kept_secs,
            removed_secs,
            keep_count,
            degenerate_count: self.segments.len() - keep_count,
            silence_count: self.segments.len().saturating_sub(1),
            keep_ratio,
        }
    }
}

/// Statistics about a keep plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStats {
    /// Total duration of keep segments in seconds.
    pub kept_secs: f64,
    /// Total duration removed in seconds.
    pub removed_secs: f64,
    /// Number of non-degenerate keep segments.
    pub keep_count: usize,
    /// Number of zero-length keep segments.
    pub degenerate_count: usize,
    /// Number of silence intervals the plan was built from.
    pub silence_count: usize,
    /// Ratio of kept content (0.0 to 1.0).
    pub keep_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_intervals_accepts_sorted() {
        let intervals = vec![
            SilenceInterval::new(0.0, 1.0),
            SilenceInterval::new(1.0, 1.0),
            SilenceInterval::new(2.5, 3.0),
        ];
        assert!(validate_intervals(&intervals).is_ok());
    }

    #[test]
    fn test_validate_intervals_rejects_overlap_and_inversion() {
        let overlapping = vec![SilenceInterval::new(0.0, 2.0), SilenceInterval::new(1.5, 3.0)];
        assert_eq!(
            validate_intervals(&overlapping),
            Err(ConfigError::OverlappingIntervals { index: 1 })
        );

        let inverted = vec![SilenceInterval::new(2.0, 1.0)];
        assert!(matches!(
            validate_intervals(&inverted),
            Err(ConfigError::InvalidInterval { index: 0, .. })
        ));

        let negative = vec![SilenceInterval::new(-0.5, 1.0)];
        assert!(validate_intervals(&negative).is_err());
    }

    #[test]
    fn test_plan_stats() {
        let plan = KeepPlan {
            segments: vec![
                KeepSegment::new(0.0, 0.0),
                KeepSegment::new(1.0, 4.0),
                KeepSegment::new(5.0, 10.0),
            ],
            total_duration: 10.0,
        };

        let stats = plan.stats();
        assert!((stats.kept_secs - 8.0).abs() < 1e-9);
        assert!((stats.removed_secs - 2.0).abs() < 1e-9);
        assert_eq!(stats.keep_count, 2);
        assert_eq!(stats.degenerate_count, 1);
        assert_eq!(stats.silence_count, 2);
        assert!((stats.keep_ratio - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_non_degenerate_keeps_original_indices() {
        let plan = KeepPlan {
            segments: vec![KeepSegment::new(0.0, 0.0), KeepSegment::new(1.0, 2.0)],
            total_duration: 2.0,
        };
        let indices: Vec<_> = plan.non_degenerate().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1]);
    }
}
