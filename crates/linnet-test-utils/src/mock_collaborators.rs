// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock search provider and media source.

use std::sync::Arc;

use async_trait::async_trait;
use linnet_core::{LinnetError, MediaSource, QuotedMedia, SearchProvider};
use tokio::sync::Mutex;

/// A search provider returning a fixed outcome and recording its queries.
pub struct MockSearch {
    outcome: Result<Option<String>, String>,
    queries: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockSearch {
    pub fn returning(results: impl Into<String>) -> Self {
        Self {
            outcome: Ok(Some(results.into())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `(query, max_results)` pairs received so far.
    pub async fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Option<String>, LinnetError> {
        self.queries
            .lock()
            .await
            .push((query.to_string(), max_results));
        self.outcome
            .clone()
            .map_err(|message| LinnetError::Internal(format!("search failed: {message}")))
    }
}

/// A media source returning a fixed image payload.
pub struct MockMedia {
    image: Option<String>,
    fail: bool,
    loaded: Arc<Mutex<Vec<QuotedMedia>>>,
}

impl MockMedia {
    pub fn returning(image_base64: impl Into<String>) -> Self {
        Self {
            image: Some(image_base64.into()),
            fail: false,
            loaded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            fail: true,
            loaded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn loaded(&self) -> Vec<QuotedMedia> {
        self.loaded.lock().await.clone()
    }
}

#[async_trait]
impl MediaSource for MockMedia {
    async fn load(&self, media: &QuotedMedia) -> Result<Option<String>, LinnetError> {
        self.loaded.lock().await.push(media.clone());
        if self.fail {
            return Err(LinnetError::Internal("media download failed".to_string()));
        }
        Ok(self.image.clone())
    }
}
