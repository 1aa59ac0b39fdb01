// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Ollama `/api/generate` endpoint.

use serde::{Deserialize, Serialize};

/// Body of a non-streaming generate call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Base64-encoded images for vision models.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateOptions {
    pub num_predict: u32,
    pub temperature: f32,
}

/// The subset of the generate response Linnet reads.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub eval_count: u64,
    /// Nanoseconds.
    #[serde(default)]
    pub total_duration: u64,
}
