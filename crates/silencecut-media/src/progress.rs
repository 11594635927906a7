//! FFmpeg `-progress` state.

use serde::{Deserialize, Serialize};

/// Latest values from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Output written so far, in milliseconds
    pub out_time_ms: i64,
    /// Multiple of realtime
    pub speed: f64,
    /// Set by the final `progress=end` block
    pub finished: bool,
}

impl FfmpegProgress {
    /// Share of `total_ms` written so far, clamped to `[0, 1]`.
    pub fn fraction(&self, total_ms: i64) -> f64 {
        if total_ms <= 0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / total_ms as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.fraction(10000) - 0.5).abs() < 0.001);
        assert_eq!(progress.fraction(4000), 1.0);
        assert_eq!(progress.fraction(0), 0.0);
    }
}
