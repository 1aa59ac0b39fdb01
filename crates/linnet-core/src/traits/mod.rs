// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrow contracts with the collaborators surrounding the admission pipeline.

pub mod backend;
pub mod channel;
pub mod media;
pub mod processor;
pub mod search;

pub use backend::{InferenceBackend, InferenceRequest};
pub use channel::ReplyChannel;
pub use media::MediaSource;
pub use processor::RequestProcessor;
pub use search::SearchProvider;
