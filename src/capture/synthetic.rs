//! Synthetic camera
//!
//! Produces blank frames at a fixed rate without touching hardware. Paired
//! with the replay landmark backend it drives the full practice loop on
//! machines without a camera, and it is what the tests open.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::device::{CameraDevice, CaptureConstraints, VideoFrame, VideoStream};
use crate::error::DeviceError;

/// Default synthetic frame rate
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Camera that always grants access and yields black frames
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    frame_rate: u32,
    startup_delay: Duration,
    opened: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            startup_delay: Duration::ZERO,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate the time a real device takes to start streaming
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// How many streams have been opened over the camera's lifetime
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    frame_interval: Duration,
    started_at: Instant,
    live: AtomicBool,
}

impl VideoStream for SyntheticStream {
    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.live.load(Ordering::SeqCst) {
            return None;
        }
        let elapsed = self.started_at.elapsed().as_nanos();
        let sequence = (elapsed / self.frame_interval.as_nanos().max(1)) as u64;
        Some(VideoFrame::blank(sequence, self.width, self.height))
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Synthetic stream stopped");
        }
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.live.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl CameraDevice for SyntheticCamera {
    async fn open(&self, constraints: &CaptureConstraints) -> Result<Box<dyn VideoStream>, DeviceError> {
        if !self.startup_delay.is_zero() {
            tokio::time::sleep(self.startup_delay).await;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        info!(
            "Synthetic camera streaming {}x{} at {} fps",
            constraints.width, constraints.height, self.frame_rate
        );
        Ok(Box::new(SyntheticStream {
            width: constraints.width,
            height: constraints.height,
            frame_interval: Duration::from_secs(1) / self.frame_rate,
            started_at: Instant::now(),
            live: AtomicBool::new(true),
        }))
    }

    fn name(&self) -> String {
        "synthetic".to_string()
    }
}
