// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-facing side of Linnet.
//!
//! The [`Dispatcher`] turns inbound transport events into queued requests,
//! answering admission failures directly. The [`InferenceProcessor`] is what
//! the queue worker runs for each admitted request: it calls the inference
//! backend and delivers the reply back into the conversation.

pub mod command;
pub mod dispatcher;
pub mod health;
pub mod messages;
pub mod processor;
pub mod shutdown;

pub use command::{Command, parse_command};
pub use dispatcher::{Dispatch, Dispatcher};
pub use health::HealthReport;
pub use processor::InferenceProcessor;
pub use shutdown::install_signal_handler;
