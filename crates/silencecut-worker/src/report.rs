//! Human and JSON summaries of a detection run.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use silencecut_models::{format_seconds, DetectionConfig, DetectionResult, KeepPlan, PlanStats, SilenceInterval};

/// Everything a caller needs to review a detection before cutting.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub source: PathBuf,
    pub duration: f64,
    /// Number of detected silence gaps
    pub count: usize,
    pub intervals: Vec<SilenceInterval>,
    pub keep_plan: KeepPlan,
    pub stats: PlanStats,
    pub config: DetectionConfig,
}

impl DetectionReport {
    pub fn new(source: &Path, result: &DetectionResult, keep_plan: KeepPlan) -> Self {
        Self {
            source: source.to_path_buf(),
            duration: result.total_duration,
            count: result.count(),
            intervals: result.intervals.clone(),
            stats: keep_plan.stats(),
            keep_plan,
            config: result.config,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering, one interval per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Source: {}", self.source.display());
        let _ = writeln!(out, "Duration: {}", format_seconds(self.duration));
        let _ = writeln!(out, "Detected Silence Gaps: {}", self.count);

        for (i, interval) in self.intervals.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>3}  {} - {}  ({:.3}s)",
                i + 1,
                format_seconds(interval.start),
                format_seconds(interval.end),
                interval.duration()
            );
        }

        let _ = writeln!(
            out,
            "Keep: {} segments, {:.2}s kept, {:.2}s removed ({:.1}% kept)",
            self.stats.keep_count,
            self.stats.kept_secs,
            self.stats.removed_secs,
            self.stats.keep_ratio * 100.0
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silencecut_models::KeepSegment;

    fn sample_report() -> DetectionReport {
        let result = DetectionResult {
            intervals: vec![SilenceInterval::new(3.0, 4.0)],
            total_duration: 10.0,
            config: DetectionConfig::default(),
        };
        let plan = KeepPlan {
            segments: vec![KeepSegment::new(0.0, 3.0), KeepSegment::new(4.0, 10.0)],
            total_duration: 10.0,
        };
        DetectionReport::new(Path::new("talk.wav"), &result, plan)
    }

    #[test]
    fn test_text_report() {
        let text = sample_report().to_text();
        assert!(text.contains("Detected Silence Gaps: 1"));
        assert!(text.contains("00:00:03 - 00:00:04"));
        assert!(text.contains("2 segments, 9.00s kept, 1.00s removed (90.0% kept)"));
    }

    #[test]
    fn test_json_report() {
        let json: serde_json::Value = serde_json::from_str(&sample_report().to_json().unwrap()).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["keep_plan"]["segments"].as_array().unwrap().len(), 2);
        assert_eq!(json["stats"]["keep_count"], 2);
        assert_eq!(json["config"]["trailing_silence"], "drop");
    }
}
