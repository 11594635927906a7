//! Error types for detection and materialization.

use std::fmt;
use std::path::PathBuf;

use silencecut_models::ConfigError;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Step of materialization that produced an encode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    /// Extracting and re-encoding one keep segment.
    Extract,
    /// Joining the per-segment outputs.
    Concat,
    /// Encoding a trimmed sample buffer.
    EncodeSamples,
    /// Moving the finished artifact into place.
    Finalize,
}

impl fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodeStage::Extract => "extract",
            EncodeStage::Concat => "concat",
            EncodeStage::EncodeSamples => "encode_samples",
            EncodeStage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during detection or materialization.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Encode failed during {stage}{}: {message}", segment_suffix(.segment))]
    Encode {
        stage: EncodeStage,
        segment: Option<usize>,
        message: String,
    },

    #[error("Source has no audio samples")]
    EmptySource,

    #[error("Every keep segment is empty; nothing would remain after trimming")]
    NothingToKeep,

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

fn segment_suffix(segment: &Option<usize>) -> String {
    match segment {
        Some(index) => format!(" of segment {}", index),
        None => String::new(),
    }
}

impl MediaError {
    /// Create a decode failure error.
    pub fn decode_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an encode failure error.
    pub fn encode_failed(
        stage: EncodeStage,
        segment: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::Encode {
            stage,
            segment,
            message: message.into(),
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Stage and segment index for encode failures.
    pub fn encode_context(&self) -> Option<(EncodeStage, Option<usize>)> {
        match self {
            MediaError::Encode { stage, segment, .. } => Some((*stage, *segment)),
            _ => None,
        }
    }
}
