//! Shared JSON-over-HTTP client for the recognition and policy services

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::NetworkError;

pub const VERIFY_SIGN_PATH: &str = "/api/verify-sign";
pub const NEXT_PATH: &str = "/alphabet/next";
pub const FEEDBACK_PATH: &str = "/alphabet/feedback";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Thin wrapper over a pooled `reqwest::Client` bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Arc<Client>,
    base_url: String,
}

impl ApiClient {
    /// Build a client whose every request is bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(Arc::new(client), base_url))
    }

    /// Reuse an existing connection pool
    pub fn with_client(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B>(&self, endpoint: &str, body: &B) -> Result<reqwest::Response, NetworkError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| NetworkError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// POST `body` to `path` and decode the JSON response
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, NetworkError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let endpoint = self.url(path);
        let response = self.send(&endpoint, body).await?;
        let text = response.text().await.map_err(|source| NetworkError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| {
            debug!("Undecodable body from {}: {}", endpoint, text);
            NetworkError::Decode {
                endpoint,
                reason: e.to_string(),
            }
        })
    }

    /// POST `body` to `path`, checking only the status
    pub async fn post_ignoring_body<B>(&self, path: &str, body: &B) -> Result<(), NetworkError>
    where
        B: Serialize + ?Sized,
    {
        let endpoint = self.url(path);
        self.send(&endpoint, body).await.map(|_| ())
    }
}
