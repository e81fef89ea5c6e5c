//! Landmark model seam
//!
//! A [`ModelLoader`] turns the asset at a fixed path into a
//! [`LandmarkExtractor`]. [`LandmarkModel`] tracks whether that has happened
//! yet; until it has, the frame loop stays quiescent and the front end shows a
//! passive "model loading" indicator.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::capture::VideoFrame;
use crate::error::ModelInitError;
use crate::types::LandmarkSnapshot;

/// Pulls hand landmarks out of one video frame
#[async_trait]
pub trait LandmarkExtractor: Send + Sync {
    /// `Ok(None)` means the frame contains no hand
    async fn extract(&self, frame: &VideoFrame) -> anyhow::Result<Option<LandmarkSnapshot>>;
}

/// Loads model assets into an extractor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, asset_path: &Path) -> Result<Arc<dyn LandmarkExtractor>, ModelInitError>;
}

/// Initialization state of the landmark model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed(String),
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::Loading => write!(f, "loading"),
            ModelStatus::Ready => write!(f, "ready"),
            ModelStatus::Failed(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

struct ModelState {
    status: ModelStatus,
    extractor: Option<Arc<dyn LandmarkExtractor>>,
}

/// Shared handle to the (possibly not yet loaded) landmark model
pub struct LandmarkModel {
    state: RwLock<ModelState>,
}

impl LandmarkModel {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ModelState {
                status: ModelStatus::Loading,
                extractor: None,
            }),
        }
    }

    /// A model that is ready immediately
    pub fn ready(extractor: Arc<dyn LandmarkExtractor>) -> Self {
        Self {
            state: RwLock::new(ModelState {
                status: ModelStatus::Ready,
                extractor: Some(extractor),
            }),
        }
    }

    /// Load assets through `loader`; on failure the model stays unavailable
    pub async fn initialize(&self, loader: &dyn ModelLoader, asset_path: &Path) -> Result<(), ModelInitError> {
        info!("Loading landmark model from {}", asset_path.display());
        match loader.load(asset_path).await {
            Ok(extractor) => {
                let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
                state.extractor = Some(extractor);
                state.status = ModelStatus::Ready;
                info!("Landmark model ready");
                Ok(())
            }
            Err(e) => {
                warn!("Landmark model unavailable: {}", e);
                let mut state = self.state.write().unwrap_or_else(|p| p.into_inner());
                state.status = ModelStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn status(&self) -> ModelStatus {
        self.state.read().unwrap_or_else(|p| p.into_inner()).status.clone()
    }

    /// The extractor, once the model is ready
    pub fn extractor(&self) -> Option<Arc<dyn LandmarkExtractor>> {
        self.state.read().unwrap_or_else(|p| p.into_inner()).extractor.clone()
    }
}

impl Default for LandmarkModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NoHands;

    #[async_trait]
    impl LandmarkExtractor for NoHands {
        async fn extract(&self, _: &VideoFrame) -> anyhow::Result<Option<LandmarkSnapshot>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_initialize_success() {
        let mut loader = MockModelLoader::new();
        loader
            .expect_load()
            .withf(|p: &Path| p == Path::new("models/hand.onnx"))
            .times(1)
            .returning(|_| Ok(Arc::new(NoHands) as Arc<dyn LandmarkExtractor>));

        let model = LandmarkModel::new();
        assert_eq!(model.status(), ModelStatus::Loading);
        assert!(model.extractor().is_none());

        model.initialize(&loader, Path::new("models/hand.onnx")).await.unwrap();
        assert_eq!(model.status(), ModelStatus::Ready);
        assert!(model.extractor().is_some());
    }

    #[tokio::test]
    async fn test_initialize_failure_leaves_model_unavailable() {
        let mut loader = MockModelLoader::new();
        loader
            .expect_load()
            .returning(|p| Err(ModelInitError::AssetMissing(PathBuf::from(p))));

        let model = LandmarkModel::new();
        let err = model.initialize(&loader, Path::new("missing.onnx")).await.unwrap_err();
        assert!(matches!(err, ModelInitError::AssetMissing(_)));
        assert!(matches!(model.status(), ModelStatus::Failed(_)));
        assert!(model.extractor().is_none());
    }
}
