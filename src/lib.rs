//! hands-in - Fingerspelling Practice Library
//!
//! The core of a sign-alphabet trainer:
//! - Camera capture session with a cancellation-safe lifecycle
//! - Per-frame hand landmark extraction into a latest-wins slot
//! - Fixed-interval recognition polling against `/api/verify-sign`
//! - Adaptive curriculum driven by an external policy service
//! - Client-held mastery map and recent attempt history
//!
//! # Example
//!
//! ```ignore
//! use hands_in::config::Config;
//! use hands_in::practice::{PracticeOptions, PracticeSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let (mut session, mut results) = PracticeSession::new(components, PracticeOptions::from(&config));
//!     session.start().await;
//!     session.start_camera().await;
//!     while let Some(detection) = results.recv().await {
//!         session.on_recognition(detection);
//!         if session.is_showing_target() {
//!             session.check_answer().await;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod error;
pub mod scheduler;
pub mod config;
pub mod api;
pub mod cli;

// Pipeline stages
pub mod capture;
pub mod perception;
pub mod inference;
pub mod curriculum;
pub mod practice;

// Re-export commonly used types for convenience
pub use types::{Landmark, LandmarkSnapshot, Letter, RecognitionResult};

pub use error::{DeviceError, ModelInitError, NetworkError};

pub use config::Config;

pub use capture::{CameraDevice, CaptureSession, CaptureStatus, SyntheticCamera};

pub use perception::{LandmarkModel, PerceptionLoop, SnapshotSlot};

pub use inference::{HttpRecognitionClient, InferencePoller, RecognitionService};

pub use curriculum::{CurriculumSession, HttpPolicyClient, MasteryTracker, PolicyService};

pub use practice::{Detection, PracticeComponents, PracticeOptions, PracticeSession};
