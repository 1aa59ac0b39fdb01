// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend for Linnet.
//!
//! Implements [`InferenceBackend`] over a local Ollama server: the request's
//! question and context are folded into one prompt and sent to
//! `/api/generate` without streaming. Images travel base64-encoded.

pub mod client;
pub mod prompt;
pub mod types;

use async_trait::async_trait;
use linnet_config::model::OllamaConfig;
use linnet_core::{HealthStatus, InferenceBackend, InferenceRequest, LinnetError};
use tracing::{info, warn};

pub use client::OllamaClient;
pub use prompt::build_prompt;

use crate::types::{GenerateOptions, GenerateRequest};

/// Ollama-backed [`InferenceBackend`].
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
    model: String,
    options: GenerateOptions,
}

impl OllamaBackend {
    pub fn new(config: &OllamaConfig) -> Result<Self, LinnetError> {
        let client = OllamaClient::new(&config.base_url)?;
        info!(base_url = client.base_url(), model = %config.model, "Ollama backend initialized");
        Ok(Self {
            client,
            model: config.model.clone(),
            options: GenerateOptions {
                num_predict: config.num_predict,
                temperature: config.temperature,
            },
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_wire(&self, request: InferenceRequest) -> GenerateRequest {
        let prompt = build_prompt(&request);
        GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
            options: self.options.clone(),
            system: request.system_prompt.filter(|s| !s.trim().is_empty()),
            images: request.image_base64.into_iter().collect(),
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: InferenceRequest) -> Result<String, LinnetError> {
        let wire = self.to_wire(request);
        let has_image = !wire.images.is_empty();
        let prompt_chars = wire.prompt.chars().count();

        let response = self.client.generate(&wire).await?;
        let text = response.response.trim().to_string();

        info!(
            model = %self.model,
            has_image,
            prompt_chars,
            tokens = response.eval_count,
            duration_ms = response.total_duration / 1_000_000,
            response_chars = text.chars().count(),
            "generation complete"
        );
        Ok(text)
    }

    async fn health_check(&self) -> Result<HealthStatus, LinnetError> {
        match self.client.tags_status().await {
            Ok(status) if status.is_success() => Ok(HealthStatus::Healthy),
            Ok(status) => Ok(HealthStatus::Degraded(format!(
                "Ollama answered {status}"
            ))),
            Err(e) => {
                warn!(error = %e, "Ollama health check failed");
                Ok(HealthStatus::Unhealthy(e.to_string()))
            }
        }
    }
}
