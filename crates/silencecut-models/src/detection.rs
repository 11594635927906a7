//! Configuration for silence detection.
//!
//! These parameters control how aggressively silence is detected and how much
//! lead-in/lead-out is preserved around speech. A `DetectionConfig` is an
//! immutable value passed into each detection run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default relative threshold (10% of the loudest frame).
pub const DEFAULT_THRESHOLD_FRACTION: f32 = 0.10;
/// Default minimum silence duration in milliseconds.
pub const DEFAULT_MIN_SILENCE_MS: u64 = 200;
/// Default offset applied to both edges of a silence interval.
pub const DEFAULT_OFFSET_MS: u64 = 20;
/// Default analysis window in samples.
pub const DEFAULT_FRAME_LENGTH: usize = 2048;
/// Default hop between analysis windows in samples.
pub const DEFAULT_HOP_LENGTH: usize = 512;

/// Relative energy threshold and minimum silence duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThresholdPolicy {
    /// Fraction (0.0-1.0) of the clip's maximum frame energy below which a
    /// frame counts as silent.
    ///
    /// The maximum is taken once over the whole clip, so a single loud
    /// transient lowers the sensitivity of the entire run.
    #[serde(default = "default_threshold_fraction")]
    pub threshold_fraction: f32,

    /// Silent runs shorter than this are not reported (milliseconds).
    #[serde(default = "default_min_silence_ms")]
    pub min_silence_ms: u64,
}

fn default_threshold_fraction() -> f32 {
    DEFAULT_THRESHOLD_FRACTION
}
fn default_min_silence_ms() -> u64 {
    DEFAULT_MIN_SILENCE_MS
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            threshold_fraction: DEFAULT_THRESHOLD_FRACTION,
            min_silence_ms: DEFAULT_MIN_SILENCE_MS,
        }
    }
}

/// Edge offsets that shrink each silence interval toward its center.
///
/// `offset_in_ms` moves the interval start later, `offset_out_ms` moves the
/// end earlier. When `locked`, the out offset mirrors the in offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OffsetPolicy {
    #[serde(default = "default_offset_ms")]
    pub offset_in_ms: u64,
    #[serde(default = "default_offset_ms")]
    pub offset_out_ms: u64,
    #[serde(default = "default_locked")]
    pub locked: bool,
}

fn default_offset_ms() -> u64 {
    DEFAULT_OFFSET_MS
}
fn default_locked() -> bool {
    true
}

impl Default for OffsetPolicy {
    fn default() -> Self {
        Self::locked(DEFAULT_OFFSET_MS)
    }
}

impl OffsetPolicy {
    /// Both edges use the same offset.
    pub fn locked(offset_ms: u64) -> Self {
        Self {
            offset_in_ms: offset_ms,
            offset_out_ms: offset_ms,
            locked: true,
        }
    }

    /// Independent in/out offsets.
    pub fn independent(offset_in_ms: u64, offset_out_ms: u64) -> Self {
        Self {
            offset_in_ms,
            offset_out_ms,
            locked: false,
        }
    }

    /// No offsets at all.
    pub fn none() -> Self {
        Self::locked(0)
    }

    /// Effective out offset in milliseconds.
    pub fn effective_out_ms(&self) -> u64 {
        if self.locked {
            self.offset_in_ms
        } else {
            self.offset_out_ms
        }
    }

    pub fn offset_in_secs(&self) -> f64 {
        self.offset_in_ms as f64 / 1000.0
    }

    pub fn offset_out_secs(&self) -> f64 {
        self.effective_out_ms() as f64 / 1000.0
    }
}

/// Analysis window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrameConfig {
    /// Samples per analysis window.
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,
    /// Samples between the starts of consecutive windows.
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
}

fn default_frame_length() -> usize {
    DEFAULT_FRAME_LENGTH
}
fn default_hop_length() -> usize {
    DEFAULT_HOP_LENGTH
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            hop_length: DEFAULT_HOP_LENGTH,
        }
    }
}

impl FrameConfig {
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        Self {
            frame_length,
            hop_length,
        }
    }

    /// Number of full windows that fit in `sample_count` samples.
    ///
    /// `floor((N - frame_length) / hop_length) + 1`, or zero when the input
    /// is shorter than one window.
    pub fn frame_count(&self, sample_count: usize) -> usize {
        if self.hop_length == 0 || sample_count < self.frame_length {
            return 0;
        }
        (sample_count - self.frame_length) / self.hop_length + 1
    }

    /// Start time in seconds of the frame at `frame_index`.
    pub fn frame_to_time(&self, frame_index: usize, sample_rate: u32) -> f64 {
        (frame_index * self.hop_length) as f64 / sample_rate as f64
    }

    /// Minimum run length in frames for a silence of `min_silence_ms`.
    pub fn min_silence_frames(&self, min_silence_ms: u64, sample_rate: u32) -> usize {
        if self.hop_length == 0 {
            return 0;
        }
        (min_silence_ms as f64 * sample_rate as f64 / self.hop_length as f64 / 1000.0).floor()
            as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_length == 0 {
            return Err(ConfigError::NonPositive("frame_length"));
        }
        if self.hop_length == 0 {
            return Err(ConfigError::NonPositive("hop_length"));
        }
        Ok(())
    }
}

/// What to do with a silent run still open when the buffer ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrailingSilence {
    /// Discard the open run; trailing fade-outs are treated as content.
    #[default]
    Drop,
    /// Close the run at the last frame and treat it like any other interval.
    Close,
}

impl std::str::FromStr for TrailingSilence {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "close" => Ok(Self::Close),
            other => Err(ConfigError::invalid_value("trailing_silence", other)),
        }
    }
}

/// Full configuration for one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DetectionConfig {
    #[serde(default)]
    pub threshold: ThresholdPolicy,
    #[serde(default)]
    pub offsets: OffsetPolicy,
    #[serde(default)]
    pub frames: FrameConfig,
    #[serde(default)]
    pub trailing_silence: TrailingSilence,
}

impl DetectionConfig {
    /// Cut shorter pauses with tighter edges.
    pub fn aggressive() -> Self {
        Self {
            threshold: ThresholdPolicy {
                threshold_fraction: 0.15,
                min_silence_ms: 100,
            },
            offsets: OffsetPolicy::locked(10),
            ..Default::default()
        }
    }

    /// Only cut long, clearly silent pauses.
    pub fn conservative() -> Self {
        Self {
            threshold: ThresholdPolicy {
                threshold_fraction: 0.05,
                min_silence_ms: 500,
            },
            offsets: OffsetPolicy::locked(50),
            ..Default::default()
        }
    }

    /// Builder-style setter for the threshold fraction.
    pub fn with_threshold(mut self, fraction: f32) -> Self {
        self.threshold.threshold_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the minimum silence duration.
    pub fn with_min_silence_ms(mut self, ms: u64) -> Self {
        self.threshold.min_silence_ms = ms;
        self
    }

    /// Builder-style setter for the offset policy.
    pub fn with_offsets(mut self, offsets: OffsetPolicy) -> Self {
        self.offsets = offsets;
        self
    }

    /// Builder-style setter for window geometry.
    pub fn with_frames(mut self, frame_length: usize, hop_length: usize) -> Self {
        self.frames = FrameConfig::new(frame_length, hop_length);
        self
    }

    /// Builder-style setter for the trailing-silence policy.
    pub fn with_trailing_silence(mut self, policy: TrailingSilence) -> Self {
        self.trailing_silence = policy;
        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.threshold.threshold_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::ThresholdOutOfRange(fraction));
        }
        self.frames.validate()
    }
}
