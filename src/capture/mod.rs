//! Camera capture
//!
//! Device seam, session lifecycle, and a synthetic camera:
//! - `device`: [`CameraDevice`] / [`VideoStream`] traits and frame types
//! - `session`: [`CaptureSession`], the Idle → Starting → Ready state machine
//! - `synthetic`: [`SyntheticCamera`] for hardware-free runs

pub mod device;
pub mod session;
pub mod synthetic;

pub use device::{CameraDevice, CaptureConstraints, FacingMode, VideoFrame, VideoStream};
pub use session::{CaptureSession, CaptureStatus};
pub use synthetic::SyntheticCamera;
