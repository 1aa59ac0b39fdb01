// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Linnet integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without a chat transport or an inference server.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted inference backend
//! - [`MockReplyChannel`] - Reply channel capturing outbound messages
//! - [`MockSearch`], [`MockMedia`] - Fixed-outcome search and media sources
//! - [`TestHarness`] - The real pipeline wired around the mocks

pub mod harness;
pub mod mock_backend;
pub mod mock_channel;
pub mod mock_collaborators;

pub use harness::{OTHER_USER, TEST_GROUP, TEST_USER, TestHarness, message_event, text_body};
pub use mock_backend::{MockBackend, MockReply};
pub use mock_channel::{Delivery, MockReplyChannel, SentMessage};
pub use mock_collaborators::{MockMedia, MockSearch};
