// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Linnet chat assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Linnet configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinnetConfig {
    /// Assistant identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Admission queue and worker settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Per-user sliding-window rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Quote/reply lookup cache.
    #[serde(default)]
    pub message_cache: MessageCacheConfig,

    /// Rolling per-conversation history.
    #[serde(default)]
    pub context: ContextConfig,

    /// Ollama inference backend.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Web search augmentation for `!web`.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System instruction sent with every inference request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Identity the assistant's own replies are recorded under.
    /// Must start with `BOT_` so history renders it as `Bot`.
    #[serde(default = "default_assistant_identity")]
    pub assistant_identity: String,

    /// Prompt used when a user quotes a message with a bare `!hej`.
    #[serde(default = "default_prompt")]
    pub default_prompt: String,

    /// Reply with the queue position and estimated wait after admission.
    #[serde(default)]
    pub announce_position: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
            assistant_identity: default_assistant_identity(),
            default_prompt: default_prompt(),
            announce_position: false,
        }
    }
}

fn default_agent_name() -> String {
    "linnet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant in a group chat.\n\
     Respond concisely and helpfully in the same language the user uses.\n\
     If analyzing images, describe what you see clearly and answer any questions about the content.\n\
     Be friendly but professional."
        .to_string()
}

fn default_assistant_identity() -> String {
    "BOT_linnet".to_string()
}

fn default_prompt() -> String {
    "Please analyze this content.".to_string()
}

/// Admission queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum number of pending requests (1..=100).
    #[serde(default = "default_queue_max_size")]
    pub max_size: usize,

    /// Hard deadline for one processing attempt, in seconds (30..=600).
    #[serde(default = "default_queue_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed per-request estimate used for wait-time announcements.
    #[serde(default = "default_average_processing_secs")]
    pub average_processing_secs: u64,

    /// How long the idle worker waits for work before re-checking shutdown.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Additional attempts after a failed (non-timeout) attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl QueueConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: default_queue_max_size(),
            timeout_secs: default_queue_timeout_secs(),
            average_processing_secs: default_average_processing_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_queue_max_size() -> usize {
    10
}

fn default_queue_timeout_secs() -> u64 {
    120
}

fn default_average_processing_secs() -> u64 {
    15
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    1
}

/// Sliding-window rate limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests allowed per user within the window (1..=100).
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in seconds (10..=300).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between sweeps of idle trackers, in seconds.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_max_requests() -> usize {
    30
}

fn default_window_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

/// Message cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessageCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl MessageCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for MessageCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_cache_capacity() -> usize {
    100
}

fn default_ttl_secs() -> u64 {
    3600
}

/// Conversation context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Entries kept per conversation.
    #[serde(default = "default_context_max_messages")]
    pub max_messages: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Entries rendered into a request's history.
    #[serde(default = "default_render_messages")]
    pub render_messages: usize,

    /// Per-entry text limit when rendering.
    #[serde(default = "default_max_entry_chars")]
    pub max_entry_chars: usize,
}

impl ContextConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: default_context_max_messages(),
            ttl_secs: default_ttl_secs(),
            render_messages: default_render_messages(),
            max_entry_chars: default_max_entry_chars(),
        }
    }
}

fn default_context_max_messages() -> usize {
    3
}

fn default_render_messages() -> usize {
    5
}

fn default_max_entry_chars() -> usize {
    200
}

/// Ollama backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            num_predict: default_num_predict(),
            temperature: default_temperature(),
        }
    }
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "gemma3:12b".to_string()
}

fn default_num_predict() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

/// Web search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_search_max_results(),
        }
    }
}

fn default_search_max_results() -> usize {
    3
}
