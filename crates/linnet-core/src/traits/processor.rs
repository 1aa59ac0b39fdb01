// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The callback the queue worker drives for every dequeued request.

use async_trait::async_trait;

use crate::error::LinnetError;
use crate::request::Request;

/// Processes one queued request.
///
/// The queue only observes the outcome: `Ok` counts as processed, `Err`
/// triggers the retry-or-drop policy, and exceeding the deadline drops the
/// request. Implementations must be cancel-safe, since the in-flight future is
/// dropped on deadline or hard shutdown.
#[async_trait]
pub trait RequestProcessor: Send + Sync {
    async fn process(&self, request: &Request) -> Result<(), LinnetError>;

    /// Called after a failed `process` when the request still had retry
    /// budget but could not be requeued. The request is dropped afterwards.
    async fn abandon(&self, _request: &Request) {}
}
