//! Per-frame landmark extraction loop
//!
//! ```text
//! CaptureSession ──frame──→ LandmarkExtractor ──snapshot──→ SnapshotSlot
//!        ▲                                                      │
//!        └──────── reschedule on next frame tick ◄──────────────┘
//! ```
//!
//! Quiescent (skips silently) until both the capture session and the model
//! are ready. Extraction errors count as "no hand" for that frame.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::LandmarkModel;
use super::snapshot::{Epoch, SnapshotSlot};
use crate::capture::CaptureSession;
use crate::scheduler::TaskHandle;

/// Default delay between frame iterations (~30 fps)
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// What a single iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Camera or model not ready yet
    Quiescent,
    /// Cancelled before or during extraction, nothing written
    Cancelled,
    /// Snapshot slot updated (with a hand or with "no hand")
    Published { hand: bool },
}

/// Frame loop state; spawn with [`PerceptionLoop::spawn`]
pub struct PerceptionLoop {
    capture: CaptureSession,
    model: Arc<LandmarkModel>,
    slot: Arc<SnapshotSlot>,
    cancel: CancellationToken,
    epoch: Epoch,
}

impl PerceptionLoop {
    /// Build a loop that writes into `slot` under a fresh epoch
    pub fn new(
        capture: CaptureSession,
        model: Arc<LandmarkModel>,
        slot: Arc<SnapshotSlot>,
        cancel: CancellationToken,
    ) -> Self {
        let epoch = slot.begin();
        Self {
            capture,
            model,
            slot,
            cancel,
            epoch,
        }
    }

    /// Start the loop on the runtime, one iteration per `frame_interval`
    pub fn spawn(
        capture: CaptureSession,
        model: Arc<LandmarkModel>,
        slot: Arc<SnapshotSlot>,
        frame_interval: Duration,
    ) -> TaskHandle {
        let cancel = CancellationToken::new();
        let perception = Self::new(capture, model, slot, cancel.clone());
        TaskHandle::spawn("perception", cancel, perception.run(frame_interval))
    }

    async fn run(self, frame_interval: Duration) {
        info!("Perception loop started ({:?} per frame)", frame_interval);
        let mut ticker = tokio::time::interval(frame_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => break,
                outcome = self.step() => outcome,
            };
            if outcome == StepOutcome::Cancelled {
                break;
            }
        }
        info!("Perception loop stopped");
    }

    /// Run one iteration
    pub async fn step(&self) -> StepOutcome {
        if self.cancel.is_cancelled() {
            return StepOutcome::Cancelled;
        }

        let Some(extractor) = self.model.extractor() else {
            return StepOutcome::Quiescent;
        };
        if !self.capture.is_ready() {
            return StepOutcome::Quiescent;
        }
        let Some(frame) = self.capture.current_frame() else {
            return StepOutcome::Quiescent;
        };

        let snapshot = match extractor.extract(&frame).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Landmark extraction failed on frame {}: {}", frame.sequence, e);
                None
            }
        };

        // The result of an extraction that straddled cancellation is dropped
        if self.cancel.is_cancelled() {
            debug!("Discarding extraction result for frame {} after cancel", frame.sequence);
            return StepOutcome::Cancelled;
        }

        let hand = snapshot.is_some();
        if self.slot.publish(self.epoch, snapshot) {
            StepOutcome::Published { hand }
        } else {
            StepOutcome::Cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConstraints, SyntheticCamera, VideoFrame};
    use crate::perception::model::LandmarkExtractor;
    use crate::types::{Landmark, LandmarkSnapshot};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct FixedHand;

    #[async_trait]
    impl LandmarkExtractor for FixedHand {
        async fn extract(&self, _: &VideoFrame) -> anyhow::Result<Option<LandmarkSnapshot>> {
            Ok(Some(LandmarkSnapshot::new(vec![Landmark::new(0.5, 0.5, 0.0); 21])?))
        }
    }

    struct Broken;

    #[async_trait]
    impl LandmarkExtractor for Broken {
        async fn extract(&self, _: &VideoFrame) -> anyhow::Result<Option<LandmarkSnapshot>> {
            anyhow::bail!("inference backend crashed")
        }
    }

    /// Blocks each extraction until released
    struct Held {
        release: Notify,
        started: AtomicUsize,
    }

    #[async_trait]
    impl LandmarkExtractor for Held {
        async fn extract(&self, _: &VideoFrame) -> anyhow::Result<Option<LandmarkSnapshot>> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(Some(LandmarkSnapshot::new(vec![Landmark::default(); 21])?))
        }
    }

    async fn ready_capture() -> CaptureSession {
        let session = CaptureSession::new(
            Arc::new(SyntheticCamera::default()),
            CaptureConstraints { width: 8, height: 8, ..Default::default() },
        );
        assert!(session.activate().await.is_ready());
        session
    }

    #[tokio::test]
    async fn test_quiescent_until_model_ready() {
        let capture = ready_capture().await;
        let slot = Arc::new(SnapshotSlot::new());
        let perception = PerceptionLoop::new(capture, Arc::new(LandmarkModel::new()), slot.clone(), CancellationToken::new());
        assert_eq!(perception.step().await, StepOutcome::Quiescent);
        assert!(slot.latest().is_none());
    }

    #[tokio::test]
    async fn test_quiescent_until_camera_ready() {
        let capture = CaptureSession::new(Arc::new(SyntheticCamera::default()), CaptureConstraints::default());
        let model = Arc::new(LandmarkModel::ready(Arc::new(FixedHand)));
        let perception = PerceptionLoop::new(capture, model, Arc::new(SnapshotSlot::new()), CancellationToken::new());
        assert_eq!(perception.step().await, StepOutcome::Quiescent);
    }

    #[tokio::test]
    async fn test_step_publishes_snapshot() {
        let capture = ready_capture().await;
        let slot = Arc::new(SnapshotSlot::new());
        let model = Arc::new(LandmarkModel::ready(Arc::new(FixedHand)));
        let perception = PerceptionLoop::new(capture, model, slot.clone(), CancellationToken::new());

        assert_eq!(perception.step().await, StepOutcome::Published { hand: true });
        assert_eq!(slot.latest().unwrap().points().len(), 21);
    }

    #[tokio::test]
    async fn test_extraction_error_counts_as_no_hand() {
        let capture = ready_capture().await;
        let slot = Arc::new(SnapshotSlot::new());
        let hand_model = Arc::new(LandmarkModel::ready(Arc::new(FixedHand)));
        let first = PerceptionLoop::new(capture.clone(), hand_model, slot.clone(), CancellationToken::new());
        first.step().await;
        assert!(slot.latest().is_some());

        let broken = Arc::new(LandmarkModel::ready(Arc::new(Broken)));
        let second = PerceptionLoop::new(capture, broken, slot.clone(), CancellationToken::new());
        assert_eq!(second.step().await, StepOutcome::Published { hand: false });
        assert!(slot.latest().is_none());
    }

    #[tokio::test]
    async fn test_no_extraction_after_cancel() {
        let capture = ready_capture().await;
        let held = Arc::new(Held { release: Notify::new(), started: AtomicUsize::new(0) });
        let model = Arc::new(LandmarkModel::ready(held.clone()));
        let cancel = CancellationToken::new();
        let perception = PerceptionLoop::new(capture, model, Arc::new(SnapshotSlot::new()), cancel.clone());

        cancel.cancel();
        assert_eq!(perception.step().await, StepOutcome::Cancelled);
        assert_eq!(held.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_in_flight_result_dropped_after_cancel() {
        let capture = ready_capture().await;
        let held = Arc::new(Held { release: Notify::new(), started: AtomicUsize::new(0) });
        let model = Arc::new(LandmarkModel::ready(held.clone()));
        let slot = Arc::new(SnapshotSlot::new());
        let cancel = CancellationToken::new();
        let perception = Arc::new(PerceptionLoop::new(capture, model, slot.clone(), cancel.clone()));

        let step = tokio::spawn({
            let perception = perception.clone();
            async move { perception.step().await }
        });
        while held.started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        cancel.cancel();
        slot.close();
        held.release.notify_one();

        assert_eq!(step.await.unwrap(), StepOutcome::Cancelled);
        assert!(slot.latest().is_none());
    }

    #[tokio::test]
    async fn test_spawned_loop_fills_slot_and_stops() {
        let capture = ready_capture().await;
        let slot = Arc::new(SnapshotSlot::new());
        let model = Arc::new(LandmarkModel::ready(Arc::new(FixedHand)));
        let handle = PerceptionLoop::spawn(capture, model, slot.clone(), Duration::from_millis(1));

        tokio::time::timeout(Duration::from_secs(2), async {
            while slot.latest().is_none() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("loop should publish a snapshot");

        handle.shutdown().await;
        slot.close();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(slot.latest().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_extraction() {
        let capture = ready_capture().await;
        let held = Arc::new(Held { release: Notify::new(), started: AtomicUsize::new(0) });
        let model = Arc::new(LandmarkModel::ready(held.clone()));
        let slot = Arc::new(SnapshotSlot::new());
        let handle = PerceptionLoop::spawn(capture, model, slot.clone(), Duration::from_millis(1));

        while held.started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::timeout(Duration::from_millis(500), handle.shutdown())
            .await
            .expect("shutdown should not wait for the held extraction");
        assert!(slot.latest().is_none());
    }
}
