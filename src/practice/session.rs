//! Practice session
//!
//! Owns the capture session, both recurring tasks, the curriculum and the
//! score counters for one learner. The front end drives it through `&mut self`
//! and feeds detections back in from the receiver returned by
//! [`PracticeSession::new`]. Each detection carries the camera run that
//! produced it; anything queued before the last `stop_camera` is rejected.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::capture::{CameraDevice, CaptureConstraints, CaptureSession, CaptureStatus};
use crate::config::Config;
use crate::curriculum::{AttemptReport, CurriculumSession, PolicyService};
use crate::inference::{InferencePoller, RecognitionCallback, RecognitionService};
use crate::perception::{LandmarkModel, ModelStatus, PerceptionLoop, SnapshotSlot};
use crate::scheduler::TaskHandle;
use crate::types::{Letter, RecognitionResult};

/// External collaborators of a practice session
pub struct PracticeComponents {
    pub camera: Arc<dyn CameraDevice>,
    pub model: Arc<LandmarkModel>,
    pub recognition: Arc<dyn RecognitionService>,
    pub policy: Arc<dyn PolicyService>,
}

/// Tunables of a practice session
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeOptions {
    pub constraints: CaptureConstraints,
    pub frame_interval: Duration,
    /// Zero disables recognition polling
    pub poll_interval: Duration,
    pub send_expected_hint: bool,
    pub confidence_threshold: f32,
}

impl Default for PracticeOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PracticeOptions {
    fn from(config: &Config) -> Self {
        Self {
            constraints: config.capture.constraints(),
            frame_interval: config.perception.frame_interval(),
            poll_interval: config.inference.poll_interval(),
            send_expected_hint: config.inference.send_expected_hint,
            confidence_threshold: config.practice.confidence_threshold,
        }
    }
}

/// A recognition result tagged with the camera run that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub run: u64,
    pub result: RecognitionResult,
}

/// Score summary for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeStats {
    pub score: u32,
    pub attempts: u32,
    /// Rounded percentage, 0 before the first attempt
    pub accuracy: u32,
    pub target: Letter,
    pub mastered: usize,
}

pub struct PracticeSession {
    id: Uuid,
    span: Span,
    capture: CaptureSession,
    model: Arc<LandmarkModel>,
    slot: Arc<SnapshotSlot>,
    recognition: Arc<dyn RecognitionService>,
    curriculum: CurriculumSession,
    options: PracticeOptions,
    expected: watch::Sender<Letter>,
    results: mpsc::UnboundedSender<Detection>,
    /// Bumped whenever the recurring tasks stop
    camera_run: u64,
    perception_task: Option<TaskHandle>,
    poll_task: Option<TaskHandle>,
    prediction: Option<RecognitionResult>,
    score: u32,
    attempts: u32,
}

impl PracticeSession {
    /// Build a session; detections arrive on the returned receiver
    pub fn new(
        components: PracticeComponents,
        options: PracticeOptions,
    ) -> (Self, mpsc::UnboundedReceiver<Detection>) {
        let id = Uuid::new_v4();
        let span = info_span!("practice", session = %id);
        let (results, receiver) = mpsc::unbounded_channel();
        let (expected, _) = watch::channel(Letter::A);

        let session = Self {
            id,
            span,
            capture: CaptureSession::new(components.camera, options.constraints.clone()),
            model: components.model,
            slot: Arc::new(SnapshotSlot::new()),
            recognition: components.recognition,
            curriculum: CurriculumSession::new(components.policy),
            options,
            expected,
            results,
            camera_run: 0,
            perception_task: None,
            poll_task: None,
            prediction: None,
            score: 0,
            attempts: 0,
        };
        (session, receiver)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> Letter {
        self.curriculum.target()
    }

    pub fn curriculum(&self) -> &CurriculumSession {
        &self.curriculum
    }

    pub fn capture_status(&self) -> CaptureStatus {
        self.capture.status()
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model.status()
    }

    pub fn prediction(&self) -> Option<RecognitionResult> {
        self.prediction
    }

    pub fn active_tracks(&self) -> usize {
        self.capture.active_tracks()
    }

    fn publish_target(&self) {
        self.expected.send_replace(self.curriculum.target());
    }

    /// Seed the first target from the policy service
    pub async fn start(&mut self) {
        let span = self.span.clone();
        async {
            info!("Practice session started");
            self.curriculum.seed().await;
            self.publish_target();
        }
        .instrument(span)
        .await
    }

    /// Start the recurring tasks and turn the camera on
    pub async fn start_camera(&mut self) -> CaptureStatus {
        {
            let _guard = self.span.enter();
            if self.perception_task.is_none() {
                self.perception_task = Some(PerceptionLoop::spawn(
                    self.capture.clone(),
                    self.model.clone(),
                    self.slot.clone(),
                    self.options.frame_interval,
                ));
            }
            if self.poll_task.is_none() {
                self.poll_task = self.spawn_poller();
            }
        }

        let status = self.capture.activate().instrument(self.span.clone()).await;
        if !status.is_ready() {
            self.stop_tasks().await;
        }
        status
    }

    fn spawn_poller(&self) -> Option<TaskHandle> {
        let results = self.results.clone();
        let run = self.camera_run;
        let on_result: RecognitionCallback = Arc::new(move |result| {
            // Receiver gone means the front end has shut down
            let _ = results.send(Detection { run, result });
        });
        let mut poller = InferencePoller::new(
            self.recognition.clone(),
            self.capture.clone(),
            self.slot.clone(),
            on_result,
        );
        if self.options.send_expected_hint {
            poller = poller.with_expected_hint(self.expected.subscribe());
        }
        poller.spawn(self.options.poll_interval)
    }

    async fn stop_tasks(&mut self) {
        let perception = self.perception_task.take();
        let poller = self.poll_task.take();
        for task in perception.iter().chain(poller.iter()) {
            task.cancel();
        }
        self.slot.close();
        self.camera_run += 1;
        for task in perception.into_iter().chain(poller) {
            task.shutdown().await;
        }
    }

    /// Cancel both tasks and release the camera
    pub async fn stop_camera(&mut self) {
        let span = self.span.clone();
        async {
            self.capture.deactivate();
            self.prediction = None;
            self.stop_tasks().await;
        }
        .instrument(span)
        .await
    }

    /// Take a detection from the poller
    ///
    /// Ignored unless the camera is Ready and the detection belongs to the
    /// current camera run. Returns whether it was kept.
    pub fn on_recognition(&mut self, detection: Detection) -> bool {
        if detection.run != self.camera_run {
            debug!("Dropping detection from camera run {}", detection.run);
            return false;
        }
        if !self.capture.is_ready() {
            return false;
        }
        self.prediction = Some(detection.result);
        true
    }

    /// The latest prediction is the target above the confidence threshold
    pub fn is_showing_target(&self) -> bool {
        self.prediction
            .map(|p| p.label == self.target() && p.confidence > self.options.confidence_threshold)
            .unwrap_or(false)
    }

    /// Judge the current prediction and advance the curriculum
    pub async fn check_answer(&mut self) -> AttemptReport {
        let span = self.span.clone();
        async {
            let is_correct = self.is_showing_target();
            self.attempts += 1;
            if is_correct {
                self.score += 1;
            }
            let report = self.curriculum.apply_and_advance(is_correct).await;
            self.publish_target();
            info!(
                "Attempt on {}: {} (score {}/{})",
                report.letter,
                if is_correct { "correct" } else { "incorrect" },
                self.score,
                self.attempts
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Move to the alphabetically next letter; no-op at Z
    pub fn skip(&mut self) -> bool {
        let moved = self.curriculum.skip_to_next();
        self.publish_target();
        moved
    }

    /// Zero the counters, forget mastery and start again from A
    pub async fn reset(&mut self) {
        let span = self.span.clone();
        async {
            self.score = 0;
            self.attempts = 0;
            self.prediction = None;
            self.curriculum.reset();
            self.publish_target();
            self.curriculum.request_next(Letter::A).await;
            self.publish_target();
            info!("Practice reset");
        }
        .instrument(span)
        .await
    }

    pub fn stats(&self) -> PracticeStats {
        let accuracy = if self.attempts == 0 {
            0
        } else {
            ((self.score as f64 / self.attempts as f64) * 100.0).round() as u32
        };
        PracticeStats {
            score: self.score,
            attempts: self.attempts,
            accuracy,
            target: self.target(),
            mastered: self.curriculum.tracker().mastery().mastered_count(),
        }
    }

    /// Stop every recurring task and release the camera
    pub async fn shutdown(mut self) {
        self.stop_camera().await;
        let _guard = self.span.enter();
        info!("Practice session ended");
    }
}

impl Drop for PracticeSession {
    fn drop(&mut self) {
        // Dropped task handles cancel their tasks
        self.capture.deactivate();
        self.slot.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SyntheticCamera;
    use crate::curriculum::{FeedbackRequest, NextRequest, NextResponse};
    use crate::error::{DeviceError, NetworkError};
    use crate::inference::{VerifySignRequest, VerifySignResponse};
    use crate::perception::ReplayExtractor;
    use crate::types::{Landmark, LandmarkSnapshot};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Always recognizes whatever letter it is told to
    struct EchoRecognizer {
        label: Mutex<String>,
        confidence: f32,
    }

    #[async_trait]
    impl RecognitionService for EchoRecognizer {
        async fn verify_sign(&self, _: &VerifySignRequest) -> Result<VerifySignResponse, NetworkError> {
            Ok(VerifySignResponse {
                top_label: self.label.lock().unwrap().clone(),
                top_confidence: self.confidence,
                probs: BTreeMap::new(),
                is_match: None,
            })
        }
    }

    /// Never answers
    #[derive(Default)]
    struct StalledRecognizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecognitionService for StalledRecognizer {
        async fn verify_sign(&self, _: &VerifySignRequest) -> Result<VerifySignResponse, NetworkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    /// Walks the alphabet in order
    #[derive(Default)]
    struct SequentialPolicy {
        feedback: Mutex<Vec<FeedbackRequest>>,
    }

    #[async_trait]
    impl PolicyService for SequentialPolicy {
        async fn next(&self, request: &NextRequest) -> Result<NextResponse, NetworkError> {
            let target = if request.mastery_level.as_u8() == 0 {
                request.current_letter
            } else {
                request.current_letter.next().unwrap_or(Letter::Z)
            };
            Ok(serde_json::from_value(serde_json::json!({
                "state_key": format!("{}:{}", request.current_letter, request.mastery_level.as_u8()),
                "action": "sequential",
                "target": { "letter": target.to_string() }
            }))
            .unwrap())
        }

        async fn feedback(&self, request: &FeedbackRequest) -> Result<(), NetworkError> {
            self.feedback.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    struct NoCamera;

    #[async_trait]
    impl CameraDevice for NoCamera {
        async fn open(&self, _: &CaptureConstraints) -> Result<Box<dyn crate::capture::VideoStream>, DeviceError> {
            Err(DeviceError::DeviceNotFound)
        }

        fn name(&self) -> String {
            "none".to_string()
        }
    }

    fn options() -> PracticeOptions {
        PracticeOptions {
            constraints: CaptureConstraints { width: 4, height: 4, ..Default::default() },
            frame_interval: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
            send_expected_hint: true,
            confidence_threshold: crate::practice::DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    fn session_with(
        camera: Arc<dyn CameraDevice>,
        label: &str,
        confidence: f32,
    ) -> (PracticeSession, mpsc::UnboundedReceiver<Detection>, Arc<SequentialPolicy>) {
        let recognizer = Arc::new(EchoRecognizer {
            label: Mutex::new(label.to_string()),
            confidence,
        });
        session_with_recognizer(camera, recognizer)
    }

    fn session_with_recognizer(
        camera: Arc<dyn CameraDevice>,
        recognition: Arc<dyn RecognitionService>,
    ) -> (PracticeSession, mpsc::UnboundedReceiver<Detection>, Arc<SequentialPolicy>) {
        let hand = LandmarkSnapshot::new(vec![Landmark::new(0.4, 0.6, 0.0); 21]).unwrap();
        let policy = Arc::new(SequentialPolicy::default());
        let components = PracticeComponents {
            camera,
            model: Arc::new(LandmarkModel::ready(Arc::new(ReplayExtractor::new(vec![Some(hand)])))),
            recognition,
            policy: policy.clone(),
        };
        let (session, results) = PracticeSession::new(components, options());
        (session, results, policy)
    }

    /// Tag a hand-made result with the session's current camera run
    fn current(session: &PracticeSession, label: Letter, confidence: f32) -> Detection {
        Detection {
            run: session.camera_run,
            result: RecognitionResult::new(label, confidence),
        }
    }

    fn letter(c: char) -> Letter {
        Letter::new(c).unwrap()
    }

    #[tokio::test]
    async fn test_full_attempt_cycle() {
        let (mut session, mut results, policy) = session_with(Arc::new(SyntheticCamera::default()), "A", 92.0);
        session.start().await;
        assert_eq!(session.target(), Letter::A);

        assert!(session.start_camera().await.is_ready());
        let result = tokio::time::timeout(Duration::from_secs(2), results.recv())
            .await
            .expect("poller should deliver a result")
            .unwrap();
        assert!(session.on_recognition(result));
        assert!(session.is_showing_target());

        let report = session.check_answer().await;
        assert!(report.outcome.is_correct);
        assert_eq!(report.next_target, letter('b'));
        assert_eq!(session.target(), letter('b'));

        let stats = session.stats();
        assert_eq!((stats.score, stats.attempts, stats.accuracy), (1, 1, 100));
        assert_eq!(policy.feedback.lock().unwrap()[0].reward, 1);

        session.stop_camera().await;
        assert_eq!(session.active_tracks(), 0);
        assert!(session.prediction().is_none());
        assert!(!session.is_showing_target());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_recognition_ignored_without_camera() {
        let (mut session, _results, _) = session_with(Arc::new(SyntheticCamera::default()), "A", 99.0);
        session.start().await;
        assert!(!session.on_recognition(current(&session, Letter::A, 99.0)));
        assert!(session.prediction().is_none());
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let (mut session, _results, _) = session_with(Arc::new(SyntheticCamera::default()), "A", 70.0);
        session.start().await;
        session.start_camera().await;

        session.on_recognition(current(&session, Letter::A, 70.0));
        assert!(!session.is_showing_target());
        session.on_recognition(current(&session, Letter::A, 70.5));
        assert!(session.is_showing_target());
        session.on_recognition(current(&session, letter('b'), 99.0));
        assert!(!session.is_showing_target());

        let report = session.check_answer().await;
        assert!(!report.outcome.is_correct);
        assert_eq!(session.target(), Letter::A);
        assert_eq!(session.stats().accuracy, 0);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_camera_failure_stops_tasks() {
        let (mut session, _results, _) = session_with(Arc::new(NoCamera), "A", 99.0);
        let status = session.start_camera().await;
        assert_eq!(status, CaptureStatus::Failed(DeviceError::DeviceNotFound));
        assert!(session.perception_task.is_none());
        assert!(session.poll_task.is_none());
    }

    #[tokio::test]
    async fn test_skip_and_reset() {
        let (mut session, _results, _) = session_with(Arc::new(SyntheticCamera::default()), "A", 99.0);
        session.start().await;
        assert!(session.skip());
        assert_eq!(session.target(), letter('b'));
        assert_eq!(*session.expected.borrow(), letter('b'));

        session.start_camera().await;
        session.on_recognition(current(&session, letter('b'), 95.0));
        session.check_answer().await;
        session.check_answer().await;
        assert_eq!(session.stats().attempts, 2);

        session.reset().await;
        let stats = session.stats();
        assert_eq!((stats.score, stats.attempts, stats.accuracy), (0, 0, 0));
        assert_eq!(stats.target, Letter::A);
        assert!(session.prediction().is_none());
        assert!(session.curriculum().tracker().history().is_empty());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_camera_does_not_wait_for_recognition() {
        let recognizer = Arc::new(StalledRecognizer::default());
        let (mut session, _results, _) = session_with_recognizer(Arc::new(SyntheticCamera::default()), recognizer.clone());
        session.start().await;
        assert!(session.start_camera().await.is_ready());

        tokio::time::timeout(Duration::from_secs(2), async {
            while recognizer.calls.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("poller should reach the recognizer");

        tokio::time::timeout(Duration::from_millis(500), session.stop_camera())
            .await
            .expect("stop_camera should return while a request is in flight");
        assert_eq!(session.active_tracks(), 0);
    }

    #[tokio::test]
    async fn test_detections_from_previous_camera_run_are_rejected() {
        let (mut session, mut results, _) = session_with(Arc::new(SyntheticCamera::default()), "A", 95.0);
        session.start().await;
        assert!(session.start_camera().await.is_ready());

        // Let a few results pile up without draining them
        let stale = tokio::time::timeout(Duration::from_secs(2), results.recv())
            .await
            .expect("poller should deliver a result")
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        session.stop_camera().await;
        assert!(session.start_camera().await.is_ready());

        assert!(!session.on_recognition(stale));
        while let Ok(queued) = results.try_recv() {
            if queued.run == stale.run {
                assert!(!session.on_recognition(queued));
            }
        }
        assert!(session.prediction().is_none());
        assert!(!session.is_showing_target());

        let fresh = loop {
            let detection = tokio::time::timeout(Duration::from_secs(2), results.recv())
                .await
                .expect("restarted poller should deliver")
                .unwrap();
            if detection.run != stale.run {
                break detection;
            }
        };
        assert!(session.on_recognition(fresh));
        assert!(session.is_showing_target());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_drop_releases_camera() {
        let camera = Arc::new(SyntheticCamera::default());
        let (mut session, _results, _) = session_with(camera.clone(), "A", 99.0);
        session.start_camera().await;
        let capture = session.capture.clone();
        assert_eq!(capture.active_tracks(), 1);

        drop(session);
        assert_eq!(capture.active_tracks(), 0);
        assert_eq!(camera.open_count(), 1);
    }
}
