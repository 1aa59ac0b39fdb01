// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./linnet.toml` > `~/.config/linnet/linnet.toml` > `/etc/linnet/linnet.toml`
//! with environment variable overrides via `LINNET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LinnetConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/linnet/linnet.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "linnet.toml";

/// Config sections, in the order env var prefixes are tried.
///
/// Sections containing underscores come first so `LINNET_RATE_LIMIT_*` is not
/// mistaken for a `rate` section.
const SECTIONS: &[&str] = &[
    "message_cache",
    "rate_limit",
    "agent",
    "queue",
    "context",
    "ollama",
    "search",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/linnet/linnet.toml` (system-wide)
/// 3. `~/.config/linnet/linnet.toml` (user XDG config)
/// 4. `./linnet.toml` (local directory)
/// 5. `LINNET_*` environment variables
pub fn load_config() -> Result<LinnetConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LinnetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LinnetConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LinnetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LinnetConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    let mut figment =
        Figment::new().merge(Serialized::defaults(LinnetConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Candidate config files, lowest precedence first. Missing files are skipped by Figment.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("linnet").join(LOCAL_CONFIG_FILE));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG_FILE));
    paths
}

/// Environment variable provider with explicit section-to-dot mapping.
///
/// `LINNET_RATE_LIMIT_MAX_REQUESTS` must map to `rate_limit.max_requests`, which
/// `Env::split("_")` cannot express.
fn env_provider() -> Env {
    Env::prefixed("LINNET_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Maps a prefix-stripped env var name to a dotted config path.
///
/// Figment hands keys over in their original case, so the name is lowercased
/// before matching sections.
pub fn env_key_to_path(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(field) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            && !field.is_empty()
        {
            return format!("{section}.{field}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(env_key_to_path("agent_log_level"), "agent.log_level");
        assert_eq!(env_key_to_path("queue_max_size"), "queue.max_size");
        assert_eq!(
            env_key_to_path("rate_limit_max_requests"),
            "rate_limit.max_requests"
        );
        assert_eq!(
            env_key_to_path("message_cache_ttl_secs"),
            "message_cache.ttl_secs"
        );
        assert_eq!(env_key_to_path("ollama_base_url"), "ollama.base_url");
    }

    #[test]
    fn uppercase_env_keys_are_lowercased() {
        assert_eq!(env_key_to_path("QUEUE_MAX_SIZE"), "queue.max_size");
        assert_eq!(
            env_key_to_path("RATE_LIMIT_WINDOW_SECS"),
            "rate_limit.window_secs"
        );
        assert_eq!(env_key_to_path("Agent_Name"), "agent.name");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(env_key_to_path("unrelated"), "unrelated");
        assert_eq!(env_key_to_path("agent"), "agent");
    }

    #[test]
    fn config_paths_end_with_local_file() {
        let paths = config_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from(SYSTEM_CONFIG_PATH)));
        assert_eq!(paths.last(), Some(&PathBuf::from(LOCAL_CONFIG_FILE)));
    }
}
