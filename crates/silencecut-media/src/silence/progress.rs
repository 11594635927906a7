//! Progress reporting for materialization runs.
//!
//! The materializer emits events on a channel instead of calling into any
//! UI; whoever holds the receiver decides how to display them. Events are
//! delivered in order and never dropped.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

/// Progress event emitted during materialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Run started
    Started {
        strategy: String,
        total_segments: usize,
    },

    /// A keep segment is about to be produced
    Segment { index: usize, start: f64, end: f64 },

    /// Overall progress; `fraction` never decreases within a run
    Progress {
        fraction: f64,
        eta_secs: Option<f64>,
        message: String,
    },

    /// Output is in place at the requested path
    Complete,

    /// Run aborted; intermediates have been removed
    Failed { error: String },
}

/// Progress sender handed to the materializer.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Send a progress event. A dropped receiver is ignored.
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }

    pub fn started(&self, strategy: &str, total_segments: usize) {
        self.send(ProgressEvent::Started {
            strategy: strategy.to_string(),
            total_segments,
        });
    }

    pub fn segment(&self, index: usize, start: f64, end: f64) {
        self.send(ProgressEvent::Segment { index, start, end });
    }

    pub fn progress(&self, fraction: f64, eta_secs: Option<f64>, message: impl Into<String>) {
        self.send(ProgressEvent::Progress {
            fraction,
            eta_secs,
            message: message.into(),
        });
    }

    pub fn complete(&self) {
        self.send(ProgressEvent::Complete);
    }

    pub fn failed(&self, error: impl Into<String>) {
        self.send(ProgressEvent::Failed {
            error: error.into(),
        });
    }
}

/// Progress receiver for collecting events.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Receive the next progress event.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Try to receive a progress event without blocking.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain every event already queued.
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Create a progress channel pair.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender::new(tx), ProgressReceiver { rx })
}

/// A no-op progress sender for when progress reporting is not needed.
pub fn noop_sender() -> ProgressSender {
    let (tx, _rx) = mpsc::unbounded_channel();
    ProgressSender::new(tx)
}

/// Tracks completed units of work and estimates time remaining.
///
/// The estimate is the running average cost per unit multiplied by the units
/// left. It is advisory only.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    done: usize,
    elapsed: Duration,
    last_fraction: f64,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            elapsed: Duration::ZERO,
            last_fraction: 0.0,
        }
    }

    /// Record one finished unit that took `cost`; returns `(fraction, eta_secs)`.
    pub fn record(&mut self, cost: Duration) -> (f64, Option<f64>) {
        self.done = (self.done + 1).min(self.total);
        self.elapsed += cost;
        (self.fraction(), self.eta_secs())
    }

    /// Fraction of units finished, in `[0, 1]` and never decreasing.
    pub fn fraction(&mut self) -> f64 {
        let raw = if self.total == 0 {
            1.0
        } else {
            self.done as f64 / self.total as f64
        };
        self.last_fraction = self.last_fraction.max(raw.clamp(0.0, 1.0));
        self.last_fraction
    }

    /// Estimated seconds remaining, if at least one unit has finished.
    pub fn eta_secs(&self) -> Option<f64> {
        if self.done == 0 {
            return None;
        }
        let average = self.elapsed.as_secs_f64() / self.done as f64;
        Some(average * (self.total - self.done) as f64)
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_channel_preserves_order() {
        let (sender, mut receiver) = channel();

        sender.started("encode_per_segment", 2);
        sender.progress(0.5, Some(1.0), "segment 1/2");
        sender.complete();

        assert!(matches!(
            receiver.recv().await.unwrap(),
            ProgressEvent::Started { total_segments: 2, .. }
        ));
        assert!(matches!(
            receiver.recv().await.unwrap(),
            ProgressEvent::Progress { fraction, .. } if (fraction - 0.5).abs() < 1e-9
        ));
        assert_eq!(receiver.recv().await.unwrap(), ProgressEvent::Complete);
    }

    #[test]
    fn test_noop_sender() {
        let sender = noop_sender();
        // Should not panic even though receiver is dropped
        sender.started("sample_domain", 1);
        sender.complete();
    }

    #[test]
    fn test_tracker_eta_uses_average_cost() {
        let mut tracker = ProgressTracker::new(4);
        assert_eq!(tracker.eta_secs(), None);

        let (fraction, eta) = tracker.record(Duration::from_secs(2));
        assert!((fraction - 0.25).abs() < 1e-9);
        assert!((eta.unwrap() - 6.0).abs() < 1e-9);

        let (fraction, eta) = tracker.record(Duration::from_secs(4));
        assert!((fraction - 0.5).abs() < 1e-9);
        // average 3s, two remaining
        assert!((eta.unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_is_monotonic_and_bounded() {
        let mut tracker = ProgressTracker::new(2);
        let mut last = 0.0;
        for _ in 0..5 {
            let (fraction, eta) = tracker.record(Duration::from_millis(10));
            assert!(fraction >= last);
            assert!(fraction <= 1.0);
            assert!(eta.unwrap() >= 0.0);
            last = fraction;
        }
        assert_eq!(last, 1.0);
        assert_eq!(tracker.done(), 2);
    }

    #[test]
    fn test_empty_tracker_is_complete() {
        let mut tracker = ProgressTracker::new(0);
        assert_eq!(tracker.fraction(), 1.0);
        assert_eq!(tracker.total(), 0);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(ProgressEvent::Segment {
            index: 1,
            start: 0.5,
            end: 2.0,
        })
        .unwrap();
        assert_eq!(json["type"], "segment");
        assert_eq!(json["index"], 1);
    }
}
