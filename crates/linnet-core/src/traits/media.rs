// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of quoted media into an image payload.

use async_trait::async_trait;

use crate::error::LinnetError;
use crate::request::QuotedMedia;

/// Loads quoted media as a base64 image payload for the backend.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns `Ok(None)` when the media is gone or not an image.
    async fn load(&self, media: &QuotedMedia) -> Result<Option<String>, LinnetError>;
}
