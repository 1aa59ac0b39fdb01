// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a local Ollama server.

use std::time::Duration;

use linnet_core::LinnetError;
use tracing::debug;

use crate::types::{GenerateRequest, GenerateResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin wrapper over `reqwest` for the two Ollama endpoints Linnet uses.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, LinnetError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LinnetError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/generate` without streaming.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LinnetError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_connect() {
                    format!("cannot connect to Ollama at {}: {e}", self.base_url)
                } else if e.is_timeout() {
                    format!("Ollama request timed out: {e}")
                } else {
                    format!("HTTP request failed: {e}")
                };
                LinnetError::Backend {
                    message,
                    source: Some(Box::new(e)),
                }
            })?;

        let status = response.status();
        debug!(status = %status, "generate response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(LinnetError::backend(format!(
                "Ollama returned {status}: {excerpt}"
            )));
        }

        let body = response.text().await.map_err(|e| LinnetError::Backend {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| LinnetError::Backend {
            message: format!("failed to parse Ollama response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// `GET /api/tags`; returns the HTTP status on any response.
    pub async fn tags_status(&self) -> Result<reqwest::StatusCode, LinnetError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| LinnetError::Backend {
                message: format!("Ollama health probe failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(response.status())
    }
}
