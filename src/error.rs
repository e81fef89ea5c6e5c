//! Error taxonomy for the practice loop
//!
//! Device errors block camera use, model errors degrade to a "still loading"
//! indicator, and network errors are always non-fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Camera acquisition failure, classified the way the platform reports it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera found")]
    DeviceNotFound,
    #[error("unable to access the camera: {0}")]
    Other(String),
}

impl DeviceError {
    /// Message shown to the learner in place of the video feed
    pub fn user_message(&self) -> &'static str {
        match self {
            DeviceError::PermissionDenied => "Camera permission denied.",
            DeviceError::DeviceNotFound => "No camera found.",
            DeviceError::Other(_) => "Unable to access the camera.",
        }
    }
}

/// Landmark model could not be initialized
#[derive(Debug, Clone, Error)]
pub enum ModelInitError {
    #[error("model asset not found at {}", .0.display())]
    AssetMissing(PathBuf),
    #[error("failed to load model from {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },
}

/// Failure talking to the recognition or policy service
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl NetworkError {
    pub fn endpoint(&self) -> &str {
        match self {
            NetworkError::Transport { endpoint, .. }
            | NetworkError::Status { endpoint, .. }
            | NetworkError::Decode { endpoint, .. } => endpoint,
        }
    }
}
