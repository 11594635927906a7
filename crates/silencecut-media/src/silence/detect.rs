//! End-to-end detection over a decoded buffer.

use silencecut_models::{DetectionConfig, DetectionResult, SampleBuffer};
use tracing::{debug, info};

use super::envelope::energy_frames;
use super::planner::plan_keep_segments;
use super::segmenter::detect_intervals;
use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// Detect silence in `buffer` using `config`.
///
/// Pure apart from logging and metrics: identical input and configuration
/// always produce identical intervals. A result with no intervals is a
/// valid outcome.
pub fn detect_silence(buffer: &SampleBuffer, config: &DetectionConfig) -> MediaResult<DetectionResult> {
    config.validate()?;
    if buffer.is_empty() {
        return Err(MediaError::EmptySource);
    }

    let frames = energy_frames(buffer, &config.frames)?;
    let envelope: Vec<f32> = frames.iter().map(|f| f.energy).collect();
    let intervals = detect_intervals(
        &envelope,
        config,
        buffer.sample_rate(),
        buffer.duration_secs(),
    )?;

    let result = DetectionResult {
        intervals,
        total_duration: buffer.duration_secs(),
        config: *config,
    };

    let loudest = frames.iter().max_by(|a, b| a.energy.total_cmp(&b.energy));
    debug!(
        frames = frames.len(),
        loudest_frame = loudest.map(|f| f.index),
        peak_energy = loudest.map(|f| f.energy),
        threshold_fraction = config.threshold.threshold_fraction,
        min_silence_ms = config.threshold.min_silence_ms,
        "Energy envelope scanned"
    );

    let stats = plan_keep_segments(result.total_duration, &result.intervals)?.stats();
    info!(
        intervals = result.count(),
        silence_secs = format!("{:.2}", result.silence_secs()),
        keep_ratio = format!("{:.1}%", stats.keep_ratio * 100.0),
        duration = format!("{:.2}", result.total_duration),
        "Silence detection complete"
    );

    metrics::record_detection(result.count());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use silencecut_models::{OffsetPolicy, TrailingSilence};

    const RATE: u32 = 8000;

    /// `millis` of a 0.8 amplitude square wave, or zeros when `loud` is false.
    fn block(millis: usize, loud: bool) -> Vec<f32> {
        let n = millis * RATE as usize / 1000;
        (0..n)
            .map(|i| if !loud { 0.0 } else if i % 2 == 0 { 0.8 } else { -0.8 })
            .collect()
    }

    fn buffer_from(blocks: &[(usize, bool)]) -> SampleBuffer {
        let samples = blocks.iter().flat_map(|&(ms, loud)| block(ms, loud)).collect();
        SampleBuffer::mono(samples, RATE).unwrap()
    }

    #[test]
    fn test_detects_gap_between_speech() {
        let buffer = buffer_from(&[(1000, true), (1000, false), (1000, true)]);
        let config = DetectionConfig::default().with_offsets(OffsetPolicy::none());

        let result = detect_silence(&buffer, &config).unwrap();
        assert_eq!(result.count(), 1);
        assert!((result.total_duration - 3.0).abs() < 1e-9);

        // Windows straddling either edge stay loud, so the interval sits inside the gap
        let interval = result.intervals[0];
        assert!(interval.start >= 1.0 && interval.start < 1.1, "start {}", interval.start);
        assert!(interval.end > 1.7 && interval.end < 2.0, "end {}", interval.end);
    }

    #[test]
    fn test_no_silence_is_not_an_error() {
        let buffer = buffer_from(&[(2000, true)]);
        let result = detect_silence(&buffer, &DetectionConfig::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn test_trailing_policy_applies_end_to_end() {
        let buffer = buffer_from(&[(1000, true), (1000, false)]);

        let dropped = detect_silence(&buffer, &DetectionConfig::default()).unwrap();
        assert!(dropped.is_empty());

        let closed = detect_silence(
            &buffer,
            &DetectionConfig::default().with_trailing_silence(TrailingSilence::Close),
        )
        .unwrap();
        assert_eq!(closed.count(), 1);
        let out = closed.config.offsets.offset_out_secs();
        assert!((closed.intervals[0].end - (closed.total_duration - out)).abs() < 1e-9);
    }

    #[test]
    fn test_closed_trailing_silence_leaves_no_tail() {
        // 150 samples past the last full window are never framed
        let mut samples = block(1000, true);
        samples.extend(block(1000, false));
        samples.extend(std::iter::repeat(0.0).take(150));
        let buffer = SampleBuffer::mono(samples, RATE).unwrap();

        let config = DetectionConfig::default()
            .with_offsets(OffsetPolicy::none())
            .with_trailing_silence(TrailingSilence::Close);
        let result = detect_silence(&buffer, &config).unwrap();
        assert_eq!(result.intervals.last().map(|i| i.end), Some(buffer.duration_secs()));

        let plan = plan_keep_segments(result.total_duration, &result.intervals).unwrap();
        assert!(plan.segments.last().unwrap().is_degenerate());

        // Only the out offset survives at the end
        let config = config.with_offsets(OffsetPolicy::independent(0, 20));
        let result = detect_silence(&buffer, &config).unwrap();
        let plan = plan_keep_segments(result.total_duration, &result.intervals).unwrap();
        let tail = plan.segments.last().unwrap();
        assert!((tail.duration() - 0.02).abs() < 1e-9, "tail {}", tail.duration());
    }

    #[test]
    fn test_stereo_uses_mono_mix() {
        // Speech only on the left channel still counts as sound
        let left = block(1000, true);
        let samples: Vec<f32> = left.iter().flat_map(|&l| [l, 0.0]).collect();
        let buffer = SampleBuffer::new(samples, RATE, 2).unwrap();

        let result = detect_silence(&buffer, &DetectionConfig::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let buffer = SampleBuffer::mono(Vec::new(), RATE).unwrap();
        let err = detect_silence(&buffer, &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, MediaError::EmptySource));
    }

    #[test]
    fn test_result_carries_config_and_is_repeatable() {
        let buffer = buffer_from(&[(500, true), (600, false), (500, true), (400, false), (500, true)]);
        let config = DetectionConfig::aggressive();

        let first = detect_silence(&buffer, &config).unwrap();
        let second = detect_silence(&buffer, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.config, config);
        assert_eq!(first.count(), 2);
    }
}
