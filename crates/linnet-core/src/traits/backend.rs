// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference backend contract (Ollama and friends).

use async_trait::async_trait;

use crate::error::LinnetError;
use crate::types::HealthStatus;

/// Everything the backend needs to produce one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Base64-encoded image for multimodal requests.
    pub image_base64: Option<String>,
    /// Text of the quoted message.
    pub context_text: Option<String>,
    pub conversation_history: Option<String>,
    pub search_results: Option<String>,
}

/// A backend that turns a prompt into generated text.
///
/// Implementations are expected to serve one request at a time; the queue
/// guarantees they are never called concurrently.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Generates a reply, or fails with [`LinnetError::Backend`].
    async fn generate(&self, request: InferenceRequest) -> Result<String, LinnetError>;

    /// Reports whether the backend is reachable.
    async fn health_check(&self) -> Result<HealthStatus, LinnetError>;
}
