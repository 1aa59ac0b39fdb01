// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web search augmentation contract.

use async_trait::async_trait;

use crate::error::LinnetError;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Searches the web and renders the hits as context text.
    ///
    /// `Ok(None)` means the search succeeded without results.
    async fn search(&self, query: &str, max_results: usize) -> Result<Option<String>, LinnetError>;
}
