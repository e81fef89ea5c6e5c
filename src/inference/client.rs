//! Recognition service contract and its HTTP client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::{ApiClient, VERIFY_SIGN_PATH};
use crate::error::NetworkError;
use crate::types::{LandmarkSnapshot, Letter, RecognitionResult};

/// Body of `POST /api/verify-sign`
#[derive(Debug, Clone, Serialize)]
pub struct VerifySignRequest {
    pub landmarks: LandmarkSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Letter>,
}

/// Response of `POST /api/verify-sign`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifySignResponse {
    pub top_label: String,
    pub top_confidence: f32,
    /// Full distribution over labels
    #[serde(default)]
    pub probs: BTreeMap<String, f32>,
    /// Whether `top_label` matched the expected hint, when one was sent
    #[serde(rename = "match", default)]
    pub is_match: Option<bool>,
}

impl VerifySignResponse {
    /// Reduce to the label and confidence the front end consumes
    pub fn recognition(&self) -> Option<RecognitionResult> {
        let label = self.top_label.parse::<Letter>().ok()?;
        Some(RecognitionResult::new(label, self.top_confidence))
    }
}

/// Something that can classify a landmark snapshot
#[async_trait]
pub trait RecognitionService: Send + Sync {
    async fn verify_sign(&self, request: &VerifySignRequest) -> Result<VerifySignResponse, NetworkError>;
}

/// [`RecognitionService`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpRecognitionClient {
    api: ApiClient,
}

impl HttpRecognitionClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RecognitionService for HttpRecognitionClient {
    async fn verify_sign(&self, request: &VerifySignRequest) -> Result<VerifySignResponse, NetworkError> {
        self.api.post_json(VERIFY_SIGN_PATH, request).await
    }
}
