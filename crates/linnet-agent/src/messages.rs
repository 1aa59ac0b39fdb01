// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply texts.

pub const QUEUE_BUSY: &str = "Sorry, the system is busy right now. Please try again later.";

pub const EMPTY_PROMPT: &str =
    "Please add a question after !hej. Example: !hej what's the weather today?";

pub const PROCESSING_ERROR: &str =
    "Something went wrong while processing your request. Please try again later.";

pub fn queued(position: usize, wait_secs: u64) -> String {
    format!(
        "Got it! Processing your request... (queue position: {position}, estimated wait {wait_secs}s)"
    )
}

pub fn rate_limited(retry_after_secs: u64) -> String {
    format!(
        "You're sending requests too quickly. Please try again in {retry_after_secs} seconds."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_carry_numbers() {
        assert!(queued(3, 45).contains("queue position: 3"));
        assert!(queued(3, 45).contains("45s"));
        assert!(rate_limited(12).contains("12 seconds"));
    }
}
