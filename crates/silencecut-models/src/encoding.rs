//! Encoding parameters passed through to the transcoder.
//!
//! The detection core never decides codec settings; these values are handed
//! to FFmpeg unchanged.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_PRESET: &str = "veryfast";
pub const DEFAULT_CRF: u8 = 20;
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// Codec settings for materialized output.
///
/// `codec`, `preset`, `crf`, `audio_codec` and `audio_bitrate` apply to
/// re-encoded segments; `sample_audio_codec` to the sample-domain path.
/// `extra_args` are appended on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    /// Video codec, e.g. "libx264"
    pub codec: String,
    pub preset: String,
    /// Constant Rate Factor (0-51, lower is better)
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// `None` lets FFmpeg pick the container's default (PCM for .wav, MP3
    /// for .mp3, ...)
    pub sample_audio_codec: Option<String>,
    pub extra_args: Vec<String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            sample_audio_codec: None,
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Output arguments for re-encoding one keep segment.
    pub fn segment_args(&self) -> Vec<String> {
        let crf = self.crf.to_string();
        let mut args: Vec<String> = [
            "-c:v",
            self.codec.as_str(),
            "-preset",
            self.preset.as_str(),
            "-crf",
            crf.as_str(),
            "-c:a",
            self.audio_codec.as_str(),
            "-b:a",
            self.audio_bitrate.as_str(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Output arguments for encoding a trimmed sample buffer.
    pub fn sample_args(&self) -> Vec<String> {
        let codec = self
            .sample_audio_codec
            .iter()
            .flat_map(|c| ["-c:a".to_string(), c.clone()]);
        codec.chain(self.extra_args.iter().cloned()).collect()
    }
}
