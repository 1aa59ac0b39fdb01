// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded admission queue with a single inference worker.
//!
//! [`QueueController`] admits requests without blocking, serializes them
//! into the registered processor one at a time, enforces the per-request
//! deadline and applies the retry-or-drop policy on failure.

pub mod controller;
pub mod recording;
mod worker;

pub use controller::{QueueController, QueueState, QueueStats};
