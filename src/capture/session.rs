//! Capture session lifecycle
//!
//! Owns at most one live [`VideoStream`]. `activate` is idempotent while a
//! request is in flight or a stream is live; `deactivate` always wins, even
//! against an open request that has not resolved yet: the late stream is
//! stopped on arrival and never exposed.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::device::{CameraDevice, CaptureConstraints, VideoFrame, VideoStream};
use crate::error::DeviceError;

/// Lifecycle state of a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    Starting,
    Ready,
    Failed(DeviceError),
}

impl CaptureStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, CaptureStatus::Ready)
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureStatus::Idle => write!(f, "Idle"),
            CaptureStatus::Starting => write!(f, "Starting camera…"),
            CaptureStatus::Ready => write!(f, "Ready"),
            CaptureStatus::Failed(e) => write!(f, "{}", e.user_message()),
        }
    }
}

struct Inner {
    status: CaptureStatus,
    stream: Option<Box<dyn VideoStream>>,
    /// Bumped by every activate/deactivate so a stale open can tell it lost
    generation: u64,
}

struct Shared {
    device: Arc<dyn CameraDevice>,
    constraints: CaptureConstraints,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(stream) = inner.stream.take() {
            stream.stop();
            debug!("Capture session dropped, camera released");
        }
    }
}

/// Cloneable handle to one camera session
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<Shared>,
}

impl CaptureSession {
    pub fn new(device: Arc<dyn CameraDevice>, constraints: CaptureConstraints) -> Self {
        Self {
            shared: Arc::new(Shared {
                device,
                constraints,
                inner: Mutex::new(Inner {
                    status: CaptureStatus::Idle,
                    stream: None,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.shared.constraints
    }

    pub fn status(&self) -> CaptureStatus {
        self.shared.lock().status.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.lock().status.is_ready()
    }

    /// Request the camera and wait for the outcome
    ///
    /// Returns the status after the request settles. While Starting or Ready
    /// this returns the current status without touching the device.
    pub async fn activate(&self) -> CaptureStatus {
        let generation = {
            let mut inner = self.shared.lock();
            match inner.status {
                CaptureStatus::Starting | CaptureStatus::Ready => {
                    debug!("Camera already {}, ignoring activate", inner.status);
                    return inner.status.clone();
                }
                CaptureStatus::Idle | CaptureStatus::Failed(_) => {}
            }
            inner.status = CaptureStatus::Starting;
            inner.generation += 1;
            inner.generation
        };

        let constraints = &self.shared.constraints;
        info!(
            "Requesting camera {} ({}x{}, {:?})",
            self.shared.device.name(),
            constraints.width,
            constraints.height,
            constraints.facing_mode
        );

        let result = self.shared.device.open(constraints).await;

        let mut inner = self.shared.lock();
        if inner.generation != generation {
            // Deactivated (or restarted) while the request was in flight
            if let Ok(stream) = result {
                stream.stop();
                info!("Camera opened after deactivation, stream stopped");
            }
            return inner.status.clone();
        }

        match result {
            Ok(stream) => {
                inner.stream = Some(stream);
                inner.status = CaptureStatus::Ready;
                info!("Camera ready");
            }
            Err(e) => {
                warn!("Camera activation failed: {}", e);
                inner.status = CaptureStatus::Failed(e);
            }
        }
        inner.status.clone()
    }

    /// Stop every track and release the device
    ///
    /// Safe to call in any state, including while `activate` is pending.
    pub fn deactivate(&self) {
        let stream = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.status = CaptureStatus::Idle;
            inner.stream.take()
        };
        if let Some(stream) = stream {
            stream.stop();
            info!("Camera stopped");
        }
    }

    /// Current frame of the live stream, `None` unless Ready
    pub fn current_frame(&self) -> Option<VideoFrame> {
        let inner = self.shared.lock();
        if !inner.status.is_ready() {
            return None;
        }
        inner.stream.as_ref().and_then(|s| s.current_frame())
    }

    /// Tracks held by this session (0 when no stream is owned)
    pub fn active_tracks(&self) -> usize {
        self.shared
            .lock()
            .stream
            .as_ref()
            .map(|s| s.active_tracks())
            .unwrap_or(0)
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.shared.device.name())
            .field("status", &self.status())
            .finish()
    }
}
