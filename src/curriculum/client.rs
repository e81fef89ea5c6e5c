//! Policy service contract and its HTTP client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::mastery::{MasteryLevel, MasteryMap};
use crate::api::{ApiClient, FEEDBACK_PATH, NEXT_PATH};
use crate::error::NetworkError;
use crate::types::Letter;

/// Action reported in feedback before the policy has chosen one
pub const DEFAULT_ACTION: &str = "practice_current";

/// Body of `POST /alphabet/next`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextRequest {
    pub current_letter: Letter,
    pub mastery_level: MasteryLevel,
    pub mastery_map: MasteryMap,
    pub recent_history: Vec<Letter>,
}

/// Response of `POST /alphabet/next`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NextResponse {
    pub state_key: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<NextTarget>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NextTarget {
    #[serde(default)]
    pub letter: Option<String>,
}

impl NextResponse {
    /// The target letter, when present and valid
    pub fn target_letter(&self) -> Option<Letter> {
        self.target
            .as_ref()
            .and_then(|t| t.letter.as_deref())
            .and_then(|l| l.parse().ok())
    }
}

/// Body of `POST /alphabet/feedback`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRequest {
    /// `None` until the first successful `next`
    pub state_key: Option<String>,
    pub action: String,
    pub reward: i8,
    pub next_state: FeedbackState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackState {
    pub letter: Letter,
    pub mastery_level: MasteryLevel,
}

/// External decision-maker for the next practice target
#[async_trait]
pub trait PolicyService: Send + Sync {
    async fn next(&self, request: &NextRequest) -> Result<NextResponse, NetworkError>;

    /// Only success or failure matters; the response body is ignored
    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), NetworkError>;
}

/// [`PolicyService`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpPolicyClient {
    api: ApiClient,
}

impl HttpPolicyClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PolicyService for HttpPolicyClient {
    async fn next(&self, request: &NextRequest) -> Result<NextResponse, NetworkError> {
        self.api.post_json(NEXT_PATH, request).await
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<(), NetworkError> {
        self.api.post_ignoring_body(FEEDBACK_PATH, request).await
    }
}
