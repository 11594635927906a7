//! Silence detection and removal.
//!
//! # Pipeline
//!
//! ```text
//! SampleBuffer ─► envelope ─► segmenter ─► planner ─► materialize
//!                 (RMS per    (silence     (keep       (sample slicing or
//!                  frame)      intervals)   segments)   per-segment encode)
//! ```
//!
//! Everything up to the planner is a pure function of the buffer and the
//! [`DetectionConfig`](silencecut_models::DetectionConfig). Materialization
//! goes through the collaborator traits and reports progress on a channel.

pub mod detect;
pub mod envelope;
pub mod materialize;
pub mod planner;
pub mod progress;
pub mod segmenter;

pub use detect::detect_silence;
pub use envelope::{compute_envelope, energy_frames};
pub use materialize::{materialize_samples, MaterializeRequest, MaterializeStrategy, Materializer};
pub use planner::plan_keep_segments;
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSender, ProgressTracker};
pub use segmenter::{classify_frames, detect_intervals, silence_threshold, SilenceSegmenter};
