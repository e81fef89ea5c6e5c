//! Landmark perception
//!
//! Turns camera frames into the latest [`LandmarkSnapshot`](crate::types::LandmarkSnapshot):
//! - `model`: extractor/loader seam and load status
//! - `snapshot`: latest-wins slot shared with the poller
//! - `frame_loop`: the per-frame extraction task
//! - `replay`: recorded landmark tracks
//! - `onnx`: ONNX Runtime hand landmark model (feature `onnx`)

pub mod frame_loop;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod replay;
pub mod snapshot;

pub use frame_loop::{PerceptionLoop, StepOutcome, DEFAULT_FRAME_INTERVAL_MS};
pub use model::{LandmarkExtractor, LandmarkModel, ModelLoader, ModelStatus};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxExtractor, OnnxLoader};
pub use replay::{ReplayExtractor, ReplayLoader};
pub use snapshot::{Epoch, SnapshotSlot};
