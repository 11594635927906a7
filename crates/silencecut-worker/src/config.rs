//! Worker configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use silencecut_media::{FfmpegDecoder, FfmpegRunner, FfmpegSampleEncoder, FfmpegTranscoder, Materializer};
use silencecut_models::EncodingConfig;

/// Default decode rate, matching the loader the detection defaults were tuned on.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding per-run scratch directories
    pub work_dir: PathBuf,
    /// Rate sources are decoded to
    pub sample_rate: u32,
    /// Channels sources are decoded to; `None` keeps the source layout
    pub channels: Option<u16>,
    /// Upper bound for any single FFmpeg process
    pub ffmpeg_timeout: Option<Duration>,
    /// Codec settings handed to FFmpeg unchanged
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("silencecut"),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: Some(1),
            ffmpeg_timeout: None,
            encoding: EncodingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let channels = match lookup("SILENCECUT_CHANNELS").as_deref().map(str::trim) {
            Some("source") | Some("0") => None,
            Some(value) => value.parse().ok().or(defaults.channels),
            None => defaults.channels,
        };

        let mut encoding = defaults.encoding.clone();
        if let Some(codec) = lookup("SILENCECUT_VIDEO_CODEC") {
            encoding.codec = codec;
        }
        if let Some(preset) = lookup("SILENCECUT_PRESET") {
            encoding.preset = preset;
        }
        if let Some(crf) = lookup("SILENCECUT_CRF").and_then(|s| s.trim().parse().ok()) {
            encoding = encoding.with_crf(crf);
        }
        if let Some(codec) = lookup("SILENCECUT_AUDIO_CODEC") {
            encoding.sample_audio_codec = Some(codec);
        }

        Self {
            work_dir: lookup("SILENCECUT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            sample_rate: parse("SILENCECUT_SAMPLE_RATE")
                .and_then(|r| u32::try_from(r).ok())
                .filter(|r| *r > 0)
                .unwrap_or(defaults.sample_rate),
            channels,
            ffmpeg_timeout: parse("SILENCECUT_FFMPEG_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            encoding,
        }
    }

    /// FFmpeg runner carrying the configured timeout.
    pub fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.ffmpeg_timeout)
    }

    pub fn decoder(&self) -> FfmpegDecoder {
        FfmpegDecoder::new(self.sample_rate, self.channels).with_runner(self.runner())
    }

    /// Materializer backed by the FFmpeg CLI.
    pub fn materializer(&self) -> Materializer {
        let encoder = FfmpegSampleEncoder::new(self.encoding.clone()).with_runner(self.runner());
        let transcoder = FfmpegTranscoder::new(self.encoding.clone()).with_runner(self.runner());
        Materializer::new(Arc::new(encoder), Arc::new(transcoder), &self.work_dir)
    }
}
