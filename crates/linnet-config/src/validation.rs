// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates range and shape constraints that serde attributes cannot express.

use std::ops::RangeInclusive;

use crate::diagnostic::ConfigError;
use crate::model::LinnetConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LinnetConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.name.trim().is_empty() {
        errors.push(invalid("agent.name must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        errors.push(invalid(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if !config.agent.assistant_identity.starts_with("BOT_") {
        errors.push(invalid(format!(
            "agent.assistant_identity `{}` must start with `BOT_`",
            config.agent.assistant_identity
        )));
    }

    if config.agent.default_prompt.trim().is_empty() {
        errors.push(invalid("agent.default_prompt must not be empty"));
    }

    check_range(
        &mut errors,
        "queue.max_size",
        config.queue.max_size as u64,
        1..=100,
    );
    check_range(
        &mut errors,
        "queue.timeout_secs",
        config.queue.timeout_secs,
        30..=600,
    );
    check_positive(
        &mut errors,
        "queue.poll_interval_ms",
        config.queue.poll_interval_ms,
    );

    check_range(
        &mut errors,
        "rate_limit.max_requests",
        config.rate_limit.max_requests as u64,
        1..=100,
    );
    check_range(
        &mut errors,
        "rate_limit.window_secs",
        config.rate_limit.window_secs,
        10..=300,
    );
    check_positive(
        &mut errors,
        "rate_limit.cleanup_interval_secs",
        config.rate_limit.cleanup_interval_secs,
    );

    check_positive(
        &mut errors,
        "message_cache.capacity",
        config.message_cache.capacity as u64,
    );
    check_positive(
        &mut errors,
        "message_cache.ttl_secs",
        config.message_cache.ttl_secs,
    );

    check_positive(
        &mut errors,
        "context.max_messages",
        config.context.max_messages as u64,
    );
    check_positive(&mut errors, "context.ttl_secs", config.context.ttl_secs);
    check_positive(
        &mut errors,
        "context.max_entry_chars",
        config.context.max_entry_chars as u64,
    );

    let base_url = config.ollama.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(invalid(format!(
            "ollama.base_url `{base_url}` must be an http(s) URL"
        )));
    }

    if config.ollama.model.trim().is_empty() {
        errors.push(invalid("ollama.model must not be empty"));
    }

    if !(0.0..=2.0).contains(&config.ollama.temperature) {
        errors.push(invalid(format!(
            "ollama.temperature must be between 0.0 and 2.0, got {}",
            config.ollama.temperature
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn check_range(errors: &mut Vec<ConfigError>, key: &str, value: u64, range: RangeInclusive<u64>) {
    if !range.contains(&value) {
        errors.push(invalid(format!(
            "{key} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )));
    }
}

fn check_positive(errors: &mut Vec<ConfigError>, key: &str, value: u64) {
    if value == 0 {
        errors.push(invalid(format!("{key} must be at least 1")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn default_config_validates() {
        let config = LinnetConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn queue_bounds_are_enforced() {
        let mut config = LinnetConfig::default();
        config.queue.max_size = 0;
        config.queue.timeout_secs = 601;
        let errors = validate_config(&config).unwrap_err();
        let msgs = messages(&errors);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].contains("queue.max_size"));
        assert!(msgs[1].contains("queue.timeout_secs"));
    }

    #[test]
    fn rate_limit_bounds_are_enforced() {
        let mut config = LinnetConfig::default();
        config.rate_limit.max_requests = 101;
        config.rate_limit.window_secs = 9;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut config = LinnetConfig::default();
        config.queue.max_size = 100;
        config.queue.timeout_secs = 30;
        config.rate_limit.max_requests = 1;
        config.rate_limit.window_secs = 300;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn assistant_identity_requires_bot_prefix() {
        let mut config = LinnetConfig::default();
        config.agent.assistant_identity = "linnet".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)[0].contains("BOT_"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = LinnetConfig::default();
        config.agent.log_level = "loud".to_string();
        config.message_cache.capacity = 0;
        config.context.ttl_secs = 0;
        config.ollama.base_url = "localhost:11434".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
