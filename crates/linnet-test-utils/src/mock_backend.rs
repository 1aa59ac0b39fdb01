// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inference backend for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linnet_core::{HealthStatus, InferenceBackend, InferenceRequest, LinnetError};
use tokio::sync::Mutex;

/// One scripted backend outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
    /// Sleeps before answering; lets tests exercise the queue deadline.
    Delayed(Duration, String),
    /// Sleeps, then fails.
    DelayedFail(Duration, String),
}

/// A backend that replays scripted outcomes in FIFO order.
///
/// When the script is exhausted, a default "mock response" text is returned.
/// Every request is recorded for later assertions.
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<InferenceRequest>>>,
    health: Arc<Mutex<HealthStatus>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            health: Arc::new(Mutex::new(HealthStatus::Healthy)),
        }
    }

    /// Creates a backend answering with `texts`, in order.
    pub fn with_responses(texts: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                texts.into_iter().map(MockReply::Text).collect(),
            )),
            ..Self::new()
        }
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn set_health(&self, status: HealthStatus) {
        *self.health.lock().await = status;
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    async fn generate(&self, request: InferenceRequest) -> Result<String, LinnetError> {
        self.requests.lock().await.push(request);
        let next = self.replies.lock().await.pop_front();
        match next {
            None => Ok("mock response".to_string()),
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(LinnetError::backend(message)),
            Some(MockReply::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(MockReply::DelayedFail(delay, message)) => {
                tokio::time::sleep(delay).await;
                Err(LinnetError::backend(message))
            }
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, LinnetError> {
        Ok(self.health.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(prompt: &str) -> InferenceRequest {
        InferenceRequest {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn scripted_replies_then_default() {
        let backend = MockBackend::with_responses(vec!["first".into(), "second".into()]);
        backend.push_reply(MockReply::Fail("boom".into())).await;

        assert_eq!(backend.generate(ask("a")).await.unwrap(), "first");
        assert_eq!(backend.generate(ask("b")).await.unwrap(), "second");
        assert!(matches!(
            backend.generate(ask("c")).await,
            Err(LinnetError::Backend { .. })
        ));
        assert_eq!(backend.generate(ask("d")).await.unwrap(), "mock response");

        let prompts: Vec<_> = backend.requests().await.into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn health_is_configurable() {
        let backend = MockBackend::new();
        assert_eq!(backend.health_check().await.unwrap(), HealthStatus::Healthy);
        backend
            .set_health(HealthStatus::Unhealthy("down".into()))
            .await;
        assert_eq!(
            backend.health_check().await.unwrap(),
            HealthStatus::Unhealthy("down".into())
        );
    }
}
