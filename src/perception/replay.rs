//! Recorded landmark track
//!
//! Serves landmarks from a recording instead of a live model. The recording
//! is JSON Lines, one entry per frame: `null` for "no hand" or an array of 21
//! `[x, y, z]` triples. Frame `n` maps to entry `n mod len`, so the track
//! loops for as long as the camera streams.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::model::{LandmarkExtractor, ModelLoader};
use crate::capture::VideoFrame;
use crate::error::ModelInitError;
use crate::types::LandmarkSnapshot;

/// Extractor backed by an in-memory landmark track
#[derive(Debug, Clone)]
pub struct ReplayExtractor {
    track: Arc<Vec<Option<LandmarkSnapshot>>>,
}

impl ReplayExtractor {
    pub fn new(track: Vec<Option<LandmarkSnapshot>>) -> Self {
        Self { track: Arc::new(track) }
    }

    /// Parse a JSON Lines recording; blank lines are skipped
    pub fn parse(contents: &str) -> Result<Self> {
        let mut track = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: Option<LandmarkSnapshot> = serde_json::from_str(line)
                .with_context(|| format!("Invalid landmark entry on line {}", lineno + 1))?;
            track.push(entry);
        }
        if track.is_empty() {
            anyhow::bail!("Recording contains no frames");
        }
        Ok(Self::new(track))
    }

    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    fn entry_for(&self, sequence: u64) -> Option<LandmarkSnapshot> {
        if self.track.is_empty() {
            return None;
        }
        let index = (sequence % self.track.len() as u64) as usize;
        self.track[index].clone()
    }
}

#[async_trait]
impl LandmarkExtractor for ReplayExtractor {
    async fn extract(&self, frame: &VideoFrame) -> Result<Option<LandmarkSnapshot>> {
        Ok(self.entry_for(frame.sequence))
    }
}

/// Loads a [`ReplayExtractor`] from a recording on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayLoader;

#[async_trait]
impl ModelLoader for ReplayLoader {
    async fn load(&self, asset_path: &Path) -> Result<Arc<dyn LandmarkExtractor>, ModelInitError> {
        if !asset_path.exists() {
            return Err(ModelInitError::AssetMissing(asset_path.to_path_buf()));
        }
        let contents = tokio::fs::read_to_string(asset_path)
            .await
            .map_err(|e| ModelInitError::Load {
                path: asset_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let extractor = ReplayExtractor::parse(&contents).map_err(|e| ModelInitError::Load {
            path: asset_path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;
        info!("Loaded {} recorded frames from {}", extractor.len(), asset_path.display());
        Ok(Arc::new(extractor))
    }
}
