// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` wires the real limiter, cache, context store, queue,
//! dispatcher and processor around mock collaborators, so tests can feed
//! inbound events and assert on what the user got back.

use std::sync::Arc;
use std::time::Duration;

use linnet_agent::{Dispatch, Dispatcher, HealthReport, InferenceProcessor};
use linnet_cache::MessageCache;
use linnet_config::model::LinnetConfig;
use linnet_context::ConversationContextStore;
use linnet_core::{
    EventKind, InboundEvent, InboundMessage, LinnetError, MessageBody, MessageId,
};
use linnet_limiter::RateLimiter;
use linnet_queue::{QueueController, QueueStats};

use crate::mock_backend::MockBackend;
use crate::mock_channel::MockReplyChannel;
use crate::mock_collaborators::{MockMedia, MockSearch};

/// A well-formed user identity.
pub const TEST_USER: &str = "U0123456789abcdef0123456789abcdef";
/// A second, distinct user identity.
pub const OTHER_USER: &str = "Ufedcba9876543210fedcba9876543210";
/// A well-formed group identity.
pub const TEST_GROUP: &str = "C0123456789abcdef0123456789abcdef";

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    config: LinnetConfig,
    responses: Vec<String>,
    search: Option<Arc<MockSearch>>,
    media: Option<Arc<MockMedia>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: LinnetConfig::default(),
            responses: Vec::new(),
            search: None,
            media: None,
        }
    }

    /// Adjusts the configuration before the components are built.
    pub fn configure(mut self, edit: impl FnOnce(&mut LinnetConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_search(mut self, search: MockSearch) -> Self {
        self.search = Some(Arc::new(search));
        self
    }

    pub fn with_media(mut self, media: MockMedia) -> Self {
        self.media = Some(Arc::new(media));
        self
    }

    /// Builds the pipeline. The queue is left stopped; call [`TestHarness::start`].
    pub fn build(self) -> TestHarness {
        let config = self.config;
        let backend = Arc::new(MockBackend::with_responses(self.responses));
        let channel = Arc::new(MockReplyChannel::new());

        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let cache = Arc::new(MessageCache::from_config(&config.message_cache));
        let context = Arc::new(ConversationContextStore::from_config(&config.context));
        let queue = Arc::new(QueueController::from_config(&config.queue));

        let mut dispatcher = Dispatcher::new(
            config.clone(),
            limiter,
            cache.clone(),
            context.clone(),
            queue.clone(),
            channel.clone(),
        );
        if let Some(search) = &self.search {
            dispatcher = dispatcher.with_search(search.clone());
        }

        let mut processor = InferenceProcessor::new(
            backend.clone(),
            channel.clone(),
            cache,
            context,
            config.agent.assistant_identity.clone(),
        );
        if let Some(media) = &self.media {
            processor = processor.with_media(media.clone());
        }

        TestHarness {
            backend,
            channel,
            search: self.search,
            media: self.media,
            dispatcher,
            processor: Arc::new(processor),
            queue,
            config,
        }
    }
}

/// A complete pipeline around mock collaborators.
pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub channel: Arc<MockReplyChannel>,
    pub search: Option<Arc<MockSearch>>,
    pub media: Option<Arc<MockMedia>>,
    pub dispatcher: Dispatcher,
    pub processor: Arc<InferenceProcessor>,
    pub queue: Arc<QueueController>,
    pub config: LinnetConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Starts the queue worker with the harness processor.
    pub fn start(&self) -> Result<(), LinnetError> {
        self.queue.start(self.processor.clone())
    }

    pub async fn stop(&self) {
        self.queue.stop(true).await;
    }

    /// Feeds a text message from [`TEST_USER`] in [`TEST_GROUP`].
    pub async fn send_text(&self, id: &str, text: &str) -> Dispatch {
        self.dispatcher
            .handle_event(message_event(id, TEST_USER, text_body(text), None))
            .await
    }

    /// Feeds a text message quoting `quoted_id`.
    pub async fn send_reply(&self, id: &str, text: &str, quoted_id: &str) -> Dispatch {
        self.dispatcher
            .handle_event(message_event(id, TEST_USER, text_body(text), Some(quoted_id)))
            .await
    }

    /// Feeds an arbitrary event.
    pub async fn send_event(&self, event: InboundEvent) -> Dispatch {
        self.dispatcher.handle_event(event).await
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport::collect(&self.dispatcher, Some(self.backend.as_ref())).await
    }

    /// Polls queue statistics until `done` holds, or fails after `limit`.
    pub async fn wait_for(
        &self,
        limit: Duration,
        done: impl Fn(&QueueStats) -> bool,
    ) -> Result<QueueStats, QueueStats> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let stats = self.queue.stats();
            if done(&stats) {
                return Ok(stats);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(stats);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Waits until `count` requests were processed successfully.
    pub async fn wait_processed(&self, count: u64) -> QueueStats {
        match self
            .wait_for(Duration::from_secs(5), |s| s.total_processed >= count)
            .await
        {
            Ok(stats) | Err(stats) => stats,
        }
    }
}

pub fn text_body(text: &str) -> MessageBody {
    MessageBody::Text {
        text: text.to_string(),
    }
}

/// A message event in [`TEST_GROUP`] with reply token `token-<id>`.
pub fn message_event(
    id: &str,
    sender: &str,
    body: MessageBody,
    quoted_id: Option<&str>,
) -> InboundEvent {
    InboundEvent {
        kind: EventKind::Message,
        reply_token: Some(format!("token-{id}")),
        sender: Some(sender.to_string()),
        conversation: Some(TEST_GROUP.to_string()),
        message: Some(InboundMessage {
            id: MessageId::new(id),
            body,
            quoted_message_id: quoted_id.map(MessageId::new),
        }),
    }
}
