//! Silence detection core and FFmpeg collaborators.
//!
//! This crate provides:
//! - Framed RMS energy envelopes and threshold-based silence segmentation
//! - Keep-plan construction from silence intervals
//! - Materialization by in-memory sample slicing or per-segment re-encoding
//! - FFmpeg command building, progress parsing, timeout and cancellation
//! - `async_trait` seams for decoding, encoding and transcoding

pub mod collaborators;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod silence;

pub use collaborators::{
    DecodedMedia, Decoder, FfmpegDecoder, FfmpegSampleEncoder, FfmpegTranscoder, SampleEncoder,
    Transcoder,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{EncodeStage, MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use silence::{
    detect_silence, materialize_samples, plan_keep_segments, MaterializeRequest,
    MaterializeStrategy, Materializer, ProgressEvent, ProgressReceiver, ProgressSender,
    ProgressTracker,
};
