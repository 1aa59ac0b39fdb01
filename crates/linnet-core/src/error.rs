// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Linnet pipeline.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across the Linnet crates.
///
/// Admission failures (`Validation`, `QueueFull`, `RateLimited`) are resolved at
/// the inbound boundary and never enter the queue. Processing failures
/// (`Timeout`, `Backend`, `Channel`, `Processing`) stay inside the queue worker.
#[derive(Debug, Error)]
pub enum LinnetError {
    /// Configuration errors (invalid values, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// A request field failed validation at construction time.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The admission queue is at capacity.
    #[error("queue is full: {size}/{max_size} requests pending")]
    QueueFull { size: usize, max_size: usize },

    /// The identity exhausted its sliding-window allowance.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Inference backend failure (unreachable, bad status, malformed body).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Reply channel failure (expired token, push rejected).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Any other failure raised while processing a queued request.
    #[error("processing error: {0}")]
    Processing(String),

    /// Lifecycle misuse (starting twice, starting without a processor).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LinnetError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a backend failure without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a channel failure without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error was produced by admission control rather than processing.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::QueueFull { .. } | Self::RateLimited { .. }
        )
    }
}
