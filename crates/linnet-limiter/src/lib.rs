// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-identity sliding-window rate limiting.
//!
//! Each identity owns an ordered list of admission timestamps. Timestamps
//! older than the window are pruned before every read or write, so a tracker
//! never holds more than `max_requests` entries. The check and the record
//! happen under the identity's map-shard lock, so two concurrent requests
//! cannot both take the last free slot.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use linnet_config::model::RateLimitConfig;
use linnet_core::types::mask;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of [`RateLimiter::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Seconds until a slot frees up; 0 when allowed, at least 1 otherwise.
    pub retry_after_secs: u64,
    /// Slots left in the current window after this decision.
    pub remaining: usize,
}

/// Limiter snapshot for health reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub active_trackers: usize,
    pub max_requests: usize,
    pub window_secs: u64,
}

/// Sliding-window rate limiter keyed by identity string.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    cleanup_interval: Duration,
    trackers: DashMap<String, VecDeque<Instant>>,
    last_cleanup: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, cleanup_interval: Duration) -> Self {
        Self {
            max_requests,
            window,
            cleanup_interval,
            trackers: DashMap::new(),
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            config.window(),
            config.cleanup_interval(),
        )
    }

    /// Admits and records one request for `identity`, or reports how long to wait.
    pub fn check_and_record(&self, identity: &str) -> RateDecision {
        let now = Instant::now();

        let decision = {
            let mut timestamps = self.trackers.entry(identity.to_string()).or_default();
            self.prune(&mut timestamps, now);

            if timestamps.len() < self.max_requests {
                timestamps.push_back(now);
                RateDecision {
                    allowed: true,
                    retry_after_secs: 0,
                    remaining: self.max_requests - timestamps.len(),
                }
            } else {
                let elapsed = timestamps
                    .front()
                    .map(|oldest| now.duration_since(*oldest))
                    .unwrap_or_default();
                RateDecision {
                    allowed: false,
                    retry_after_secs: self.window.saturating_sub(elapsed).as_secs() + 1,
                    remaining: 0,
                }
            }
        };

        if decision.allowed {
            debug!(
                identity = %mask(identity),
                remaining = decision.remaining,
                "request admitted by rate limiter"
            );
        } else {
            metrics::counter!("linnet_rate_limited_total").increment(1);
            warn!(
                identity = %mask(identity),
                retry_after_secs = decision.retry_after_secs,
                "rate limit exceeded"
            );
        }

        self.maybe_cleanup(now);
        decision
    }

    /// Slots `identity` has left in the current window, without recording anything.
    pub fn remaining(&self, identity: &str) -> usize {
        let now = Instant::now();
        let used = self
            .trackers
            .get(identity)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|ts| now.duration_since(**ts) <= self.window)
                    .count()
            })
            .unwrap_or(0);
        self.max_requests.saturating_sub(used)
    }

    /// Forgets the history of `identity`.
    pub fn reset(&self, identity: &str) {
        if self.trackers.remove(identity).is_some() {
            debug!(identity = %mask(identity), "rate limit history reset");
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            active_trackers: self.trackers.len(),
            max_requests: self.max_requests,
            window_secs: self.window.as_secs(),
        }
    }

    /// Drops trackers with no timestamps left in the window.
    ///
    /// Returns the number of trackers removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.trackers.len();
        self.trackers.retain(|_, timestamps| {
            self.prune(timestamps, now);
            !timestamps.is_empty()
        });
        let removed = before.saturating_sub(self.trackers.len());
        if removed > 0 {
            debug!(removed, "cleaned up idle rate limit trackers");
        }
        removed
    }

    fn maybe_cleanup(&self, now: Instant) {
        {
            let mut last = self
                .last_cleanup
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
            *last = now;
        }
        self.cleanup();
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
