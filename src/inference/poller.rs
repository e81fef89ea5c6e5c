//! Fixed-interval recognition polling
//!
//! Every tick reads the latest landmark snapshot and, if there is one, asks
//! the recognition service what letter it shows. Failures skip the tick; the
//! next attempt waits for the next scheduled tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::{RecognitionService, VerifySignRequest};
use crate::capture::CaptureSession;
use crate::perception::SnapshotSlot;
use crate::scheduler::TaskHandle;
use crate::types::{Letter, RecognitionResult};

/// Default time between recognition requests
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Receives each recognized (label, confidence)
pub type RecognitionCallback = Arc<dyn Fn(RecognitionResult) + Send + Sync>;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Cancelled,
    CameraNotReady,
    NoSnapshot,
    /// Request failed or the response could not be parsed
    Failed,
    /// The service answered with a label that is not a letter
    Unrecognized,
    Delivered(RecognitionResult),
}

pub struct InferencePoller {
    service: Arc<dyn RecognitionService>,
    capture: CaptureSession,
    slot: Arc<SnapshotSlot>,
    expected: Option<watch::Receiver<Letter>>,
    on_result: RecognitionCallback,
    cancel: CancellationToken,
}

impl InferencePoller {
    pub fn new(
        service: Arc<dyn RecognitionService>,
        capture: CaptureSession,
        slot: Arc<SnapshotSlot>,
        on_result: RecognitionCallback,
    ) -> Self {
        Self {
            service,
            capture,
            slot,
            expected: None,
            on_result,
            cancel: CancellationToken::new(),
        }
    }

    /// Send the current target letter along with each request
    pub fn with_expected_hint(mut self, expected: watch::Receiver<Letter>) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Start polling every `poll_interval`; a zero interval disables polling
    pub fn spawn(self, poll_interval: Duration) -> Option<TaskHandle> {
        if poll_interval.is_zero() {
            info!("Recognition polling disabled");
            return None;
        }
        let cancel = self.cancel.clone();
        Some(TaskHandle::spawn("inference", cancel, self.run(poll_interval)))
    }

    async fn run(self, period: Duration) {
        info!("Recognition polling every {:?}", period);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // An in-flight request is abandoned as soon as we are cancelled
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };
            if outcome == TickOutcome::Cancelled {
                break;
            }
        }
        info!("Recognition polling stopped");
    }

    /// Run one poll
    pub async fn tick(&self) -> TickOutcome {
        if self.cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }
        if !self.capture.is_ready() {
            return TickOutcome::CameraNotReady;
        }
        let Some(snapshot) = self.slot.latest() else {
            return TickOutcome::NoSnapshot;
        };

        let request = VerifySignRequest {
            landmarks: (*snapshot).clone(),
            expected: self.expected.as_ref().map(|rx| *rx.borrow()),
        };

        let response = match self.service.verify_sign(&request).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Recognition request skipped: {}", e);
                return TickOutcome::Failed;
            }
        };

        // Late answers after cancellation are dropped
        if self.cancel.is_cancelled() {
            debug!("Discarding recognition response after cancel");
            return TickOutcome::Cancelled;
        }

        match response.recognition() {
            Some(result) => {
                (self.on_result)(result);
                TickOutcome::Delivered(result)
            }
            None => {
                debug!("Recognition service returned non-letter label {:?}", response.top_label);
                TickOutcome::Unrecognized
            }
        }
    }
}
