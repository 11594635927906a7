//! Segment materializer: turn a keep plan into an output file.
//!
//! # Strategy
//!
//! - **Sample domain** (audio-only sources): slice the decoded buffer at
//!   every non-degenerate keep segment, concatenate in memory and hand the
//!   result to the sample encoder. Sample-accurate, no intermediates.
//! - **Encode per segment** (sources with video): re-encode each keep
//!   segment into its own file, then concat them in order. Containers can't
//!   be spliced at arbitrary offsets, so every cut boundary is re-encoded.
//!
//! Both paths write into a private run directory and only move the finished
//! artifact onto the requested path. On failure the run directory is dropped
//! with everything in it and the requested path is left alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use silencecut_models::{KeepPlan, SampleBuffer};
use tempfile::TempDir;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::progress::{ProgressSender, ProgressTracker};
use crate::collaborators::{SampleEncoder, Transcoder};
use crate::error::{EncodeStage, MediaError, MediaResult};
use crate::fs_utils::move_file;
use crate::metrics;

/// Extension used when the output path has none.
const DEFAULT_AUDIO_EXTENSION: &str = "wav";

/// How a keep plan is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializeStrategy {
    /// Slice the decoded buffer in memory.
    SampleDomain,
    /// Extract and re-encode each segment, then concat.
    EncodePerSegment,
}

impl MaterializeStrategy {
    /// Pick the strategy for a source.
    pub fn for_source(has_video: bool) -> Self {
        if has_video {
            Self::EncodePerSegment
        } else {
            Self::SampleDomain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SampleDomain => "sample_domain",
            Self::EncodePerSegment => "encode_per_segment",
        }
    }
}

impl std::fmt::Display for MaterializeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One materialization job.
#[derive(Debug, Clone)]
pub struct MaterializeRequest {
    /// Original media, read by the transcoder on the encode-per-segment path
    pub source_path: PathBuf,
    /// Where the finished output ends up
    pub output_path: PathBuf,
    pub plan: KeepPlan,
    pub strategy: MaterializeStrategy,
}

/// Concatenate the non-degenerate keep segments of `buffer`.
///
/// Segment bounds map to sample indices with `round(seconds * rate)`, so a
/// single `(0, duration)` segment reproduces the buffer exactly.
pub fn materialize_samples(buffer: &SampleBuffer, plan: &KeepPlan) -> MediaResult<SampleBuffer> {
    let rate = buffer.sample_rate() as f64;
    let mut samples = Vec::with_capacity(buffer.samples().len());

    for (_, segment) in plan.non_degenerate() {
        let start = (segment.start * rate).round() as usize;
        let end = (segment.end * rate).round() as usize;
        samples.extend_from_slice(buffer.channel_range(start, end));
    }

    if samples.is_empty() {
        return Err(MediaError::NothingToKeep);
    }

    Ok(SampleBuffer::new(samples, buffer.sample_rate(), buffer.channels())?)
}

/// Drives a keep plan through the encode collaborators.
#[derive(Clone)]
pub struct Materializer {
    encoder: Arc<dyn SampleEncoder>,
    transcoder: Arc<dyn Transcoder>,
    work_dir: PathBuf,
}

impl Materializer {
    pub fn new(
        encoder: Arc<dyn SampleEncoder>,
        transcoder: Arc<dyn Transcoder>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            encoder,
            transcoder,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Realize `request` and return the final output path.
    ///
    /// Emits `Started`, per-segment progress and exactly one of `Complete` or
    /// `Failed` on `progress`. `cancel` is checked before work starts and
    /// between segments.
    pub async fn materialize(
        &self,
        buffer: &SampleBuffer,
        request: &MaterializeRequest,
        progress: &ProgressSender,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<PathBuf> {
        let strategy = request.strategy;
        let keep_count = request.plan.non_degenerate().count();

        info!(
            strategy = %strategy,
            output = %request.output_path.display(),
            keep_segments = keep_count,
            "Materializing keep plan"
        );
        progress.started(strategy.as_str(), keep_count);

        let result = self.run(buffer, request, progress, cancel).await;
        metrics::record_materialize(strategy.as_str(), result.is_ok());

        match &result {
            Ok(path) => {
                info!(output = %path.display(), "Materialization complete");
                progress.complete();
            }
            Err(e) => {
                warn!(error = %e, "Materialization failed, intermediates removed");
                progress.failed(e.to_string());
            }
        }

        result
    }

    async fn run(
        &self,
        buffer: &SampleBuffer,
        request: &MaterializeRequest,
        progress: &ProgressSender,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<PathBuf> {
        if request.plan.non_degenerate().next().is_none() {
            return Err(MediaError::NothingToKeep);
        }
        check_cancelled(cancel)?;

        let run_dir = self.create_run_dir().await?;
        let staged = run_dir
            .path()
            .join(format!("output.{}", output_extension(&request.output_path)));

        match request.strategy {
            MaterializeStrategy::SampleDomain => {
                self.encode_samples(buffer, &request.plan, &staged, progress)
                    .await?
            }
            MaterializeStrategy::EncodePerSegment => {
                self.encode_per_segment(request, run_dir.path(), &staged, progress, cancel)
                    .await?
            }
        }

        move_file(&staged, &request.output_path)
            .await
            .map_err(|e| stage_error(EncodeStage::Finalize, None, e))?;

        // run_dir is removed on drop
        Ok(request.output_path.clone())
    }

    async fn create_run_dir(&self) -> MediaResult<TempDir> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix("silencecut-run-")
            .tempdir_in(&self.work_dir)?;
        debug!(run_dir = %dir.path().display(), "Created run directory");
        Ok(dir)
    }

    async fn encode_samples(
        &self,
        buffer: &SampleBuffer,
        plan: &KeepPlan,
        staged: &Path,
        progress: &ProgressSender,
    ) -> MediaResult<()> {
        let mut tracker = ProgressTracker::new(1);
        let started = Instant::now();

        let trimmed = materialize_samples(buffer, plan)?;
        debug!(
            input_samples = buffer.samples_per_channel(),
            output_samples = trimmed.samples_per_channel(),
            "Sliced keep segments"
        );

        self.encoder
            .encode_samples(&trimmed, staged)
            .await
            .map_err(|e| stage_error(EncodeStage::EncodeSamples, None, e))?;

        let (fraction, eta) = tracker.record(started.elapsed());
        progress.progress(fraction, eta, "Encoded trimmed audio");
        Ok(())
    }

    async fn encode_per_segment(
        &self,
        request: &MaterializeRequest,
        run_dir: &Path,
        staged: &Path,
        progress: &ProgressSender,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let extension = output_extension(&request.output_path);
        let keep: Vec<_> = request.plan.non_degenerate().collect();

        // The concat step counts as one more unit of work
        let mut tracker = ProgressTracker::new(keep.len() + 1);
        let mut parts = Vec::with_capacity(keep.len());

        for (n, (index, segment)) in keep.iter().enumerate() {
            check_cancelled(cancel)?;

            let part = run_dir.join(format!("segment_{:04}.{}", index, extension));
            debug!(
                segment = index,
                start = segment.start,
                end = segment.end,
                "Extracting keep segment"
            );
            progress.segment(*index, segment.start, segment.end);

            let started = Instant::now();
            self.transcoder
                .extract_range(&request.source_path, segment.start, segment.end, &part)
                .await
                .map_err(|e| stage_error(EncodeStage::Extract, Some(*index), e))?;
            let cost = started.elapsed();

            metrics::record_segment_encoded(cost.as_secs_f64());
            let (fraction, eta) = tracker.record(cost);
            progress.progress(
                fraction,
                eta,
                format!("Encoded segment {}/{}", n + 1, keep.len()),
            );
            parts.push(part);
        }

        check_cancelled(cancel)?;

        let started = Instant::now();
        self.transcoder
            .concat(&parts, staged)
            .await
            .map_err(|e| stage_error(EncodeStage::Concat, None, e))?;
        let (fraction, eta) = tracker.record(started.elapsed());
        progress.progress(fraction, eta, format!("Joined {} segments", parts.len()));

        Ok(())
    }
}

fn output_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_AUDIO_EXTENSION)
        .to_string()
}

fn check_cancelled(cancel: Option<&watch::Receiver<bool>>) -> MediaResult<()> {
    match cancel {
        Some(rx) if *rx.borrow() => Err(MediaError::Cancelled),
        _ => Ok(()),
    }
}

/// Attach stage and segment context unless the error already carries it.
fn stage_error(stage: EncodeStage, segment: Option<usize>, err: MediaError) -> MediaError {
    match err {
        MediaError::Encode { .. } | MediaError::Cancelled => err,
        other => MediaError::encode_failed(stage, segment, other.to_string()),
    }
}
