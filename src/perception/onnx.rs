//! Hand landmark inference using ONNX Runtime
//!
//! Runs a MediaPipe-style hand landmark model exported to ONNX:
//! - input 0: `[1, 224, 224, 3]` RGB, normalized to 0..1
//! - output 0: `[1, 63]` landmark coordinates in input pixels
//! - output 1: `[1, 1]` hand presence score
//!
//! Frames are resized with `image` before inference; inference itself runs on
//! the blocking pool so the frame loop never stalls the runtime.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbImage;
use ort::session::Session;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::model::{LandmarkExtractor, ModelLoader};
use crate::capture::VideoFrame;
use crate::error::ModelInitError;
use crate::types::{LandmarkSnapshot, LANDMARK_COUNT};

/// Square input edge expected by the model
const INPUT_SIZE: u32 = 224;

/// Presence score below which the frame counts as "no hand"
const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;

/// ONNX-backed landmark extractor
pub struct OnnxExtractor {
    session: Arc<Mutex<Session>>,
    presence_threshold: f32,
}

impl OnnxExtractor {
    /// Load the model file into an ONNX session
    pub fn from_file(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .context("Failed to create ONNX session for hand landmarks")?;

        info!("Hand landmark model loaded from {}", model_path.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
        })
    }

    pub fn with_presence_threshold(mut self, threshold: f32) -> Self {
        self.presence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Resize to the model input and scale to 0..1
    fn preprocess(frame: &VideoFrame) -> Result<Vec<f32>> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels.to_vec())
            .context("Frame buffer does not match its dimensions")?;
        let resized = image::imageops::resize(&image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        Ok(resized.into_raw().into_iter().map(|v| v as f32 / 255.0).collect())
    }

    fn run_inference(session: &mut Session, input: Vec<f32>, threshold: f32) -> Result<Option<LandmarkSnapshot>> {
        use ort::value::Value;

        let size = INPUT_SIZE as usize;
        let tensor = Value::from_array(([1usize, size, size, 3usize], input))?;
        let outputs = session.run(ort::inputs![tensor])?;

        let (_presence_shape, presence) = outputs[1].try_extract_tensor::<f32>()?;
        let score = presence.first().copied().unwrap_or(0.0);
        if score < threshold {
            debug!("Hand presence {:.2} below threshold", score);
            return Ok(None);
        }

        let (_coord_shape, coords) = outputs[0].try_extract_tensor::<f32>()?;
        if coords.len() < LANDMARK_COUNT * 3 {
            anyhow::bail!("Landmark output has {} values, expected {}", coords.len(), LANDMARK_COUNT * 3);
        }

        let scale = INPUT_SIZE as f32;
        let normalized: Vec<f32> = coords[..LANDMARK_COUNT * 3].iter().map(|v| v / scale).collect();
        Ok(Some(LandmarkSnapshot::from_flat(&normalized)?))
    }
}

#[async_trait]
impl LandmarkExtractor for OnnxExtractor {
    async fn extract(&self, frame: &VideoFrame) -> Result<Option<LandmarkSnapshot>> {
        let input = Self::preprocess(frame)?;
        let session = self.session.clone();
        let threshold = self.presence_threshold;

        tokio::task::spawn_blocking(move || {
            let mut session = session
                .lock()
                .map_err(|_| anyhow::anyhow!("ONNX session lock poisoned"))?;
            Self::run_inference(&mut session, input, threshold)
        })
        .await
        .context("Landmark inference task panicked")?
    }
}

/// Loads [`OnnxExtractor`] from a model file
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader;

#[async_trait]
impl ModelLoader for OnnxLoader {
    async fn load(&self, asset_path: &Path) -> Result<Arc<dyn LandmarkExtractor>, ModelInitError> {
        if !asset_path.exists() {
            return Err(ModelInitError::AssetMissing(asset_path.to_path_buf()));
        }
        let path = asset_path.to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || OnnxExtractor::from_file(&path))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| format!("{:#}", e)));

        match loaded {
            Ok(extractor) => Ok(Arc::new(extractor)),
            Err(reason) => Err(ModelInitError::Load {
                path: asset_path.to_path_buf(),
                reason,
            }),
        }
    }
}
