//! Shared data models for SilenceCut.
//!
//! This crate provides Serde-serializable types for:
//! - Decoded sample buffers
//! - Detection configuration (threshold, offsets, framing)
//! - Silence intervals, keep segments and reconstruction plans
//! - Encoding configuration handed to the transcoder
//! - Run identifiers

pub mod detection;
pub mod encoding;
pub mod error;
pub mod interval;
pub mod run;
pub mod sample_buffer;
pub mod timestamp;

// Re-export common types
pub use detection::{DetectionConfig, FrameConfig, OffsetPolicy, ThresholdPolicy, TrailingSilence};
pub use encoding::EncodingConfig;
pub use error::ConfigError;
pub use interval::{
    validate_intervals, DetectionResult, EnergyFrame, KeepPlan, KeepSegment, PlanStats,
    SilenceInterval,
};
pub use run::{RunId, RunKind};
pub use sample_buffer::SampleBuffer;
pub use timestamp::format_seconds;
