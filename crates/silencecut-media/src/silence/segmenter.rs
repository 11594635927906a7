//! State machine turning an energy envelope into silence intervals.
//!
//! # State Machine
//!
//! ```text
//!                 energy < threshold
//!     ┌──────────────────────────────────────┐
//!     │                                      ▼
//! ┌──────────┐                         ┌───────────┐
//! │ Sounding │                         │ InSilence │
//! └──────────┘                         └───────────┘
//!     ▲                                      │
//!     └──────────────────────────────────────┘
//!        energy >= threshold: close the run,
//!        keep it if run >= min_silence_frames
//! ```
//!
//! The threshold is a fraction of the loudest frame in the whole clip,
//! evaluated once per run.

use silencecut_models::{DetectionConfig, FrameConfig, OffsetPolicy, SilenceInterval, TrailingSilence};

use crate::error::MediaResult;

/// A closed run of silent frames, `[start_frame, end_frame)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilentRun {
    pub start_frame: usize,
    pub end_frame: usize,
}

impl SilentRun {
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Internal state for the segmenter state machine.
enum State {
    /// Current frame is above the threshold.
    Sounding,
    /// Inside a silent run that started at `start_frame`.
    InSilence { start_frame: usize },
}

/// Collects silent runs from a stream of per-frame classifications.
pub struct SilenceSegmenter {
    min_silence_frames: usize,
    state: State,
    runs: Vec<SilentRun>,
}

impl SilenceSegmenter {
    /// Create a segmenter that keeps runs of at least `min_silence_frames`.
    pub fn new(min_silence_frames: usize) -> Self {
        Self {
            min_silence_frames,
            state: State::Sounding,
            runs: Vec::new(),
        }
    }

    /// Process the classification of frame `index`.
    pub fn ingest_frame(&mut self, index: usize, is_silent: bool) {
        match (&self.state, is_silent) {
            (State::Sounding, true) => {
                self.state = State::InSilence { start_frame: index };
            }
            (State::InSilence { start_frame }, false) => {
                self.close_run(*start_frame, index);
                self.state = State::Sounding;
            }
            _ => {}
        }
    }

    /// Finish the scan after `frame_count` frames and return the kept runs.
    pub fn finalize(mut self, frame_count: usize, trailing: TrailingSilence) -> Vec<SilentRun> {
        if let State::InSilence { start_frame } = self.state {
            match trailing {
                TrailingSilence::Drop => {}
                TrailingSilence::Close => self.close_run(start_frame, frame_count),
            }
        }
        self.runs
    }

    fn close_run(&mut self, start_frame: usize, end_frame: usize) {
        let run = SilentRun {
            start_frame,
            end_frame,
        };
        if run.len() >= self.min_silence_frames {
            self.runs.push(run);
        }
    }
}

/// Absolute threshold: `threshold_fraction * max(energies)`.
pub fn silence_threshold(energies: &[f32], threshold_fraction: f32) -> f32 {
    threshold_fraction * max_energy(energies)
}

fn max_energy(energies: &[f32]) -> f32 {
    energies.iter().copied().fold(0.0f32, f32::max)
}

/// Classify each frame as silent (`true`) or not.
///
/// A frame is silent iff its energy is strictly below the threshold. When the
/// whole clip has zero energy every frame is silent.
pub fn classify_frames(energies: &[f32], threshold_fraction: f32) -> Vec<bool> {
    if max_energy(energies) <= 0.0 {
        return vec![true; energies.len()];
    }

    let threshold = silence_threshold(energies, threshold_fraction);
    energies.iter().map(|&energy| energy < threshold).collect()
}

/// Scan an energy envelope and return silent runs in frame units.
pub fn detect_runs(
    energies: &[f32],
    config: &DetectionConfig,
    sample_rate: u32,
) -> MediaResult<Vec<SilentRun>> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(silencecut_models::ConfigError::NonPositive("sample_rate").into());
    }

    let min_frames = config
        .frames
        .min_silence_frames(config.threshold.min_silence_ms, sample_rate);
    let mut segmenter = SilenceSegmenter::new(min_frames);

    for (index, is_silent) in classify_frames(energies, config.threshold.threshold_fraction)
        .into_iter()
        .enumerate()
    {
        segmenter.ingest_frame(index, is_silent);
    }

    Ok(segmenter.finalize(energies.len(), config.trailing_silence))
}

/// Convert a run to seconds and apply edge offsets.
///
/// The start moves later by the in offset and the end earlier by the out
/// offset. The start never goes below zero and the end never precedes the
/// start, so oversized offsets collapse the interval to zero length.
pub fn run_to_interval(
    run: SilentRun,
    frames: &FrameConfig,
    offsets: &OffsetPolicy,
    sample_rate: u32,
) -> SilenceInterval {
    apply_offsets(
        frames.frame_to_time(run.start_frame, sample_rate),
        frames.frame_to_time(run.end_frame, sample_rate),
        offsets,
    )
}

fn apply_offsets(start: f64, end: f64, offsets: &OffsetPolicy) -> SilenceInterval {
    let start = (start + offsets.offset_in_secs()).max(0.0);
    let end = (end - offsets.offset_out_secs()).max(start);
    SilenceInterval::new(start, end)
}

/// Full segmentation: energy envelope to ordered silence intervals.
///
/// `total_duration` is the length of the analysed input in seconds. A run
/// still open after the last frame (kept only under
/// [`TrailingSilence::Close`]) ends there rather than at the start time of
/// the frame past the envelope, since the final partial window is never
/// framed.
pub fn detect_intervals(
    energies: &[f32],
    config: &DetectionConfig,
    sample_rate: u32,
    total_duration: f64,
) -> MediaResult<Vec<SilenceInterval>> {
    let runs = detect_runs(energies, config, sample_rate)?;
    let frame_count = energies.len();

    Ok(runs
        .into_iter()
        .map(|run| {
            if run.end_frame < frame_count {
                return run_to_interval(run, &config.frames, &config.offsets, sample_rate);
            }
            apply_offsets(
                config.frames.frame_to_time(run.start_frame, sample_rate),
                total_duration,
                &config.offsets,
            )
        })
        .collect())
}
