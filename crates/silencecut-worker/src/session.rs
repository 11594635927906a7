//! A loaded source and the runs performed against it.
//!
//! Detection and materialization run as background tasks and report back
//! over one ordered event channel. Each kind of run is guarded by its own
//! busy flag: starting a second run of the same kind while one is active is
//! rejected immediately, never queued.
//!
//! The decoded buffer and every [`DetectionResult`] are immutable snapshots
//! behind `Arc`. A successful detection swaps the stored result whole; a
//! failed one leaves the previous result in place.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use silencecut_media::silence::progress;
use silencecut_media::{
    detect_silence, plan_keep_segments, DecodedMedia, Decoder, MaterializeRequest,
    MaterializeStrategy, Materializer, MediaInfo, ProgressEvent,
};
use silencecut_models::{DetectionConfig, DetectionResult, KeepPlan, RunId, RunKind, SampleBuffer};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;

/// Event emitted by a session's background runs, in the order they happen.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    DetectionStarted {
        run_id: RunId,
    },
    DetectionComplete {
        run_id: RunId,
        result: Arc<DetectionResult>,
    },
    DetectionFailed {
        run_id: RunId,
        error: String,
    },
    MaterializeStarted {
        run_id: RunId,
        strategy: MaterializeStrategy,
    },
    Progress {
        run_id: RunId,
        event: ProgressEvent,
    },
    MaterializeComplete {
        run_id: RunId,
        path: PathBuf,
    },
    MaterializeFailed {
        run_id: RunId,
        error: String,
    },
}

impl SessionEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            SessionEvent::DetectionStarted { run_id }
            | SessionEvent::DetectionComplete { run_id, .. }
            | SessionEvent::DetectionFailed { run_id, .. }
            | SessionEvent::MaterializeStarted { run_id, .. }
            | SessionEvent::Progress { run_id, .. }
            | SessionEvent::MaterializeComplete { run_id, .. }
            | SessionEvent::MaterializeFailed { run_id, .. } => run_id,
        }
    }

    /// True for the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::DetectionComplete { .. }
                | SessionEvent::DetectionFailed { .. }
                | SessionEvent::MaterializeComplete { .. }
                | SessionEvent::MaterializeFailed { .. }
        )
    }
}

/// Receiving half of a session's event channel.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Holds a busy flag for as long as it lives.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Claim `flag`, or fail with `Busy(kind)` if it is already held.
    pub fn acquire(flag: &Arc<AtomicBool>, kind: RunKind) -> WorkerResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkerError::Busy(kind))?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A decoded source plus its latest detection result.
pub struct Session {
    source_path: PathBuf,
    media: Arc<DecodedMedia>,
    materializer: Materializer,
    detection: Arc<RwLock<Option<Arc<DetectionResult>>>>,
    detecting: Arc<AtomicBool>,
    materializing: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel_tx: watch::Sender<bool>,
}

impl Session {
    /// Decode `path` once and return the session with its event receiver.
    pub async fn load(
        path: impl AsRef<Path>,
        decoder: &dyn Decoder,
        materializer: Materializer,
    ) -> WorkerResult<(Self, SessionEvents)> {
        let path = path.as_ref();
        let media = decoder.decode(path).await?;
        debug!(
            path = %path.display(),
            duration = format!("{:.2}", media.buffer.duration_secs()),
            has_video = media.has_video(),
            "Source loaded"
        );

        Ok(Self::from_media(path, media, materializer))
    }

    /// Build a session around already decoded media.
    pub fn from_media(
        path: impl Into<PathBuf>,
        media: DecodedMedia,
        materializer: Materializer,
    ) -> (Self, SessionEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let (cancel_tx, _) = watch::channel(false);

        let session = Self {
            source_path: path.into(),
            media: Arc::new(media),
            materializer,
            detection: Arc::new(RwLock::new(None)),
            detecting: Arc::new(AtomicBool::new(false)),
            materializing: Arc::new(AtomicBool::new(false)),
            events,
            cancel_tx,
        };
        (session, rx)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.media.buffer
    }

    pub fn media_info(&self) -> &MediaInfo {
        &self.media.info
    }

    pub fn is_detecting(&self) -> bool {
        self.detecting.load(Ordering::Acquire)
    }

    pub fn is_materializing(&self) -> bool {
        self.materializing.load(Ordering::Acquire)
    }

    /// The most recent successful detection, if any.
    pub fn latest_detection(&self) -> Option<Arc<DetectionResult>> {
        self.detection
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Keep plan for the latest detection.
    pub fn keep_plan(&self) -> WorkerResult<KeepPlan> {
        let detection = self.latest_detection().ok_or(WorkerError::NoDetection)?;
        Ok(plan_keep_segments(
            detection.total_duration,
            &detection.intervals,
        )?)
    }

    /// Start a detection run in the background.
    ///
    /// Fails with `Busy` if a detection is already running. The returned
    /// handle resolves to the new result, which has also been stored.
    pub fn start_detection(
        &self,
        config: DetectionConfig,
    ) -> WorkerResult<JoinHandle<WorkerResult<Arc<DetectionResult>>>> {
        let guard = BusyGuard::acquire(&self.detecting, RunKind::Detection)?;

        let run_id = RunId::new();
        let media = Arc::clone(&self.media);
        let slot = Arc::clone(&self.detection);
        let events = self.events.clone();

        Ok(tokio::spawn(async move {
            let _guard = guard;
            let logger = RunLogger::new(&run_id, RunKind::Detection);
            logger.log_start(&format!(
                "threshold {:.2}, min silence {}ms",
                config.threshold.threshold_fraction, config.threshold.min_silence_ms
            ));
            let _ = events.send(SessionEvent::DetectionStarted {
                run_id: run_id.clone(),
            });

            let outcome = tokio::task::spawn_blocking(move || detect_silence(&media.buffer, &config))
                .await
                .map_err(|e| WorkerError::task_failed(e.to_string()))
                .and_then(|r| r.map_err(WorkerError::from));

            match outcome {
                Ok(result) => {
                    let result = Arc::new(result);
                    *slot.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                        Some(Arc::clone(&result));

                    logger.log_completion(&format!("{} silence intervals", result.count()));
                    let _ = events.send(SessionEvent::DetectionComplete {
                        run_id,
                        result: Arc::clone(&result),
                    });
                    Ok(result)
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    let _ = events.send(SessionEvent::DetectionFailed {
                        run_id,
                        error: e.to_string(),
                    });
                    Err(e)
                }
            }
        }))
    }

    /// Start materializing the latest detection into `output_path`.
    ///
    /// `strategy` defaults to the one implied by the source's streams.
    /// Fails with `Busy` if a materialization is already running and with
    /// `NoDetection` before any detection has succeeded.
    pub fn start_materialization(
        &self,
        output_path: impl Into<PathBuf>,
        strategy: Option<MaterializeStrategy>,
    ) -> WorkerResult<JoinHandle<WorkerResult<PathBuf>>> {
        let guard = BusyGuard::acquire(&self.materializing, RunKind::Materialization)?;

        let strategy = strategy.unwrap_or_else(|| MaterializeStrategy::for_source(self.media.has_video()));
        let request = MaterializeRequest {
            source_path: self.source_path.clone(),
            output_path: output_path.into(),
            plan: self.keep_plan()?,
            strategy,
        };

        self.cancel_tx.send_replace(false);
        let cancel_rx = self.cancel_tx.subscribe();

        let run_id = RunId::new();
        let media = Arc::clone(&self.media);
        let materializer = self.materializer.clone();
        let events = self.events.clone();

        Ok(tokio::spawn(async move {
            let _guard = guard;
            let logger = RunLogger::new(&run_id, RunKind::Materialization);
            logger.log_start(&format!(
                "{} -> {}",
                request.strategy,
                request.output_path.display()
            ));
            let _ = events.send(SessionEvent::MaterializeStarted {
                run_id: run_id.clone(),
                strategy,
            });

            let (progress_tx, mut progress_rx) = progress::channel();
            let forwarder = {
                let events = events.clone();
                let run_id = run_id.clone();
                let logger = logger.clone();
                tokio::spawn(async move {
                    while let Some(event) = progress_rx.recv().await {
                        if let ProgressEvent::Segment { index, start, end } = &event {
                            logger.log_progress(&format!(
                                "segment {} ({:.2}s - {:.2}s)",
                                index, start, end
                            ));
                        }
                        let _ = events.send(SessionEvent::Progress {
                            run_id: run_id.clone(),
                            event,
                        });
                    }
                })
            };

            let outcome = materializer
                .materialize(&media.buffer, &request, &progress_tx, Some(&cancel_rx))
                .await
                .map_err(WorkerError::from);

            // Flush progress before the terminal event
            drop(progress_tx);
            let _ = forwarder.await;

            match outcome {
                Ok(path) => {
                    logger.log_completion(&path.display().to_string());
                    let _ = events.send(SessionEvent::MaterializeComplete {
                        run_id,
                        path: path.clone(),
                    });
                    Ok(path)
                }
                Err(e) => {
                    if e.is_cancelled() {
                        logger.log_warning("cancelled");
                    } else {
                        logger.log_error(&e.to_string());
                    }
                    let _ = events.send(SessionEvent::MaterializeFailed {
                        run_id,
                        error: e.to_string(),
                    });
                    Err(e)
                }
            }
        }))
    }

    /// Ask the running materialization to stop before its next segment.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}
