// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregated health snapshot of the pipeline.

use linnet_cache::MessageCacheStats;
use linnet_context::ContextStats;
use linnet_core::{HealthStatus, InferenceBackend};
use linnet_limiter::RateLimiterStats;
use linnet_queue::{QueueState, QueueStats};
use serde::Serialize;

use crate::dispatcher::Dispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub name: String,
    pub status: Overall,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Point-in-time view of every component, suitable for a status endpoint or log line.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: Overall,
    pub queue: QueueStats,
    pub rate_limiter: RateLimiterStats,
    pub message_cache: MessageCacheStats,
    pub context: ContextStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendHealth>,
}

impl HealthReport {
    /// Snapshots the stores behind `dispatcher` and, when given, probes `backend`.
    ///
    /// A stopped or draining queue degrades the report; an unreachable backend
    /// makes it unhealthy.
    pub async fn collect(
        dispatcher: &Dispatcher,
        backend: Option<&dyn InferenceBackend>,
    ) -> Self {
        let queue = dispatcher.queue().stats();
        let mut status = if queue.state == QueueState::Running {
            Overall::Healthy
        } else {
            Overall::Degraded
        };

        let backend = match backend {
            Some(backend) => {
                let health = probe(backend).await;
                status = worst(status, health.status);
                Some(health)
            }
            None => None,
        };

        Self {
            status,
            queue,
            rate_limiter: dispatcher.limiter().stats(),
            message_cache: dispatcher.cache().stats(),
            context: dispatcher.context().stats(),
            backend,
        }
    }
}

async fn probe(backend: &dyn InferenceBackend) -> BackendHealth {
    let (status, detail) = match backend.health_check().await {
        Ok(HealthStatus::Healthy) => (Overall::Healthy, None),
        Ok(HealthStatus::Degraded(detail)) => (Overall::Degraded, Some(detail)),
        Ok(HealthStatus::Unhealthy(detail)) => (Overall::Unhealthy, Some(detail)),
        Err(e) => (Overall::Unhealthy, Some(e.to_string())),
    };
    BackendHealth {
        name: backend.name().to_string(),
        status,
        detail,
    }
}

fn worst(a: Overall, b: Overall) -> Overall {
    match (a, b) {
        (Overall::Unhealthy, _) | (_, Overall::Unhealthy) => Overall::Unhealthy,
        (Overall::Degraded, _) | (_, Overall::Degraded) => Overall::Degraded,
        _ => Overall::Healthy,
    }
}
