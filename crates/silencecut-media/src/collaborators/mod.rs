//! Decode, encode and transcode seams.
//!
//! The detection core never touches codecs directly. These traits are the
//! only way it reads or writes media; the FFmpeg implementations live in
//! [`ffmpeg`], tests substitute fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use silencecut_models::SampleBuffer;

use crate::error::MediaResult;
use crate::probe::MediaInfo;

pub mod ffmpeg;

pub use ffmpeg::{FfmpegDecoder, FfmpegSampleEncoder, FfmpegTranscoder};

/// A decoded source: samples plus what the container holds.
#[derive(Debug, Clone)]
pub struct DecodedMedia {
    pub buffer: SampleBuffer,
    pub info: MediaInfo,
}

impl DecodedMedia {
    /// Whether materialization needs the encode-per-segment path.
    pub fn has_video(&self) -> bool {
        self.info.has_video
    }
}

/// Loads a source file into memory.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Decode `path`; fails with `MediaError::Decode` on unreadable input.
    async fn decode(&self, path: &Path) -> MediaResult<DecodedMedia>;
}

/// Writes an in-memory buffer to a file.
#[async_trait]
pub trait SampleEncoder: Send + Sync {
    async fn encode_samples(&self, buffer: &SampleBuffer, output: &Path) -> MediaResult<()>;
}

/// Re-encodes time ranges of a source and joins the results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Re-encode `[start, end)` seconds of `source` into `output`.
    async fn extract_range(&self, source: &Path, start: f64, end: f64, output: &Path) -> MediaResult<()>;

    /// Join `parts` in order into `output`.
    async fn concat(&self, parts: &[PathBuf], output: &Path) -> MediaResult<()>;
}
