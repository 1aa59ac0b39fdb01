// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Linnet chat assistant.
//!
//! This crate provides the request model, the shared error type, the chat
//! event types handed over by the transport, and the collaborator traits the
//! admission pipeline is wired against.

pub mod error;
pub mod request;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LinnetError;
pub use request::{QuotedMedia, Request, RequestBuilder, RequestId};
pub use types::{
    EventKind, HealthStatus, Identity, IdentityKind, InboundEvent, InboundMessage, MessageBody,
    MessageId, MessageKind,
};

pub use traits::{
    InferenceBackend, InferenceRequest, MediaSource, ReplyChannel, RequestProcessor,
    SearchProvider,
};
