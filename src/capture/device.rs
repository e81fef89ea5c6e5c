//! Camera device seam
//!
//! The host platform (browser media APIs, V4L2, AVFoundation, ...) sits behind
//! [`CameraDevice`]. Opening a device may trigger an OS permission prompt and
//! switches on the activity light; stopping every track of the returned
//! [`VideoStream`] releases it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::DeviceError;

/// Default preferred capture width
pub const DEFAULT_WIDTH: u32 = 640;

/// Default preferred capture height
pub const DEFAULT_HEIGHT: u32 = 480;

/// Which camera to prefer on devices with several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Resolution hints and presentation options for a capture request
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    /// Preferred width in pixels (a hint, not a requirement)
    pub width: u32,
    /// Preferred height in pixels
    pub height: u32,
    pub facing_mode: FacingMode,
    /// Display hint for whatever renders the preview. Devices and the
    /// landmark path ignore it, so landmark x stays in camera space.
    pub mirrored: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            facing_mode: FacingMode::User,
            mirrored: true,
        }
    }
}

/// One decoded RGB8 video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Monotonic frame number within the stream
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Packed RGB8 pixels, `width * height * 3` bytes
    pub pixels: Arc<[u8]>,
    pub captured_at: Instant,
}

impl VideoFrame {
    /// A black frame of the given size
    pub fn blank(sequence: u64, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self {
            sequence,
            width,
            height,
            pixels: vec![0u8; len].into(),
            captured_at: Instant::now(),
        }
    }
}

/// A live video source returned by a successful device open
pub trait VideoStream: Send + Sync {
    /// The frame currently being displayed, if the stream has produced one
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Stop every track of the stream and release the device
    fn stop(&self);

    /// Number of tracks still live
    fn active_tracks(&self) -> usize;
}

/// A camera that can be asked for a video stream
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Request a stream; resolves after the permission prompt and device start
    async fn open(&self, constraints: &CaptureConstraints) -> Result<Box<dyn VideoStream>, DeviceError>;

    /// Human-readable device label for logs
    fn name(&self) -> String;
}
