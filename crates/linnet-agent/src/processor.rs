// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request processor the queue worker drives.

use std::sync::Arc;

use async_trait::async_trait;
use linnet_cache::{CachedMessage, MessageCache};
use linnet_context::ConversationContextStore;
use linnet_core::{
    InferenceBackend, InferenceRequest, LinnetError, MediaSource, MessageId, MessageKind,
    ReplyChannel, Request, RequestProcessor,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::messages;

/// Generates a reply with the inference backend and delivers it.
///
/// Delivery uses the request's reply token when present and falls back to a
/// push into the conversation. A delivered reply is cached and recorded in
/// the conversation context under the assistant identity, so that later
/// messages can quote it and later asks see it in their history.
pub struct InferenceProcessor {
    backend: Arc<dyn InferenceBackend>,
    channel: Arc<dyn ReplyChannel>,
    media: Option<Arc<dyn MediaSource>>,
    cache: Arc<MessageCache>,
    context: Arc<ConversationContextStore>,
    assistant_identity: String,
}

impl InferenceProcessor {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        channel: Arc<dyn ReplyChannel>,
        cache: Arc<MessageCache>,
        context: Arc<ConversationContextStore>,
        assistant_identity: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            channel,
            media: None,
            cache,
            context,
            assistant_identity: assistant_identity.into(),
        }
    }

    /// Enables loading of quoted images.
    pub fn with_media(mut self, media: Arc<dyn MediaSource>) -> Self {
        self.media = Some(media);
        self
    }

    async fn load_image(&self, request: &Request) -> Option<String> {
        let quoted = request.quoted_media()?;
        let Some(media) = &self.media else {
            debug!(request_id = %request.id(), "no media source, ignoring quoted image");
            return None;
        };
        match media.load(quoted).await {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    request_id = %request.id(),
                    error = %e,
                    "failed to load quoted image, continuing with text only"
                );
                None
            }
        }
    }

    async fn generate(&self, request: &Request) -> Result<String, LinnetError> {
        let image_base64 = self.load_image(request).await;
        let system_prompt = Some(request.system_prompt())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        let inference = InferenceRequest {
            prompt: request.prompt().to_string(),
            system_prompt,
            image_base64,
            context_text: request.quoted_text().map(str::to_string),
            conversation_history: request.history().map(str::to_string),
            search_results: request.search_results().map(str::to_string),
        };
        self.backend.generate(inference).await
    }

    async fn deliver(&self, request: &Request, text: &str) -> Result<(), LinnetError> {
        if let Some(token) = request.reply_token() {
            match self.channel.reply(token, text).await {
                Ok(sent_id) => {
                    self.remember(request, sent_id, text);
                    return Ok(());
                }
                Err(e) => {
                    warn!(request_id = %request.id(), error = %e, "reply failed, falling back to push");
                }
            }
        }

        match self.channel.push(request.conversation().as_str(), text).await {
            Ok(sent_id) => {
                self.remember(request, sent_id, text);
                Ok(())
            }
            Err(e) => Err(LinnetError::Channel {
                message: "reply could not be delivered".to_string(),
                source: Some(Box::new(e)),
            }),
        }
    }

    fn remember(&self, request: &Request, sent_id: Option<MessageId>, text: &str) {
        if let Some(id) = sent_id {
            self.cache.put(id, CachedMessage::text(text));
        }
        self.context.append(
            request.conversation().as_str(),
            &self.assistant_identity,
            text,
            MessageKind::Text,
        );
    }

    /// Best-effort failure notice for a request that will not be processed again.
    async fn notify_failure(&self, request: &Request) {
        if let Some(token) = request.reply_token()
            && self
                .channel
                .reply(token, messages::PROCESSING_ERROR)
                .await
                .is_ok()
        {
            return;
        }
        if let Err(e) = self
            .channel
            .push(request.conversation().as_str(), messages::PROCESSING_ERROR)
            .await
        {
            warn!(request_id = %request.id(), error = %e, "could not notify user of failure");
        }
    }
}

#[async_trait]
impl RequestProcessor for InferenceProcessor {
    async fn process(&self, request: &Request) -> Result<(), LinnetError> {
        let started = Instant::now();
        let result = match self.generate(request).await {
            Ok(text) => self.deliver(request, &text).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => info!(
                request_id = %request.id(),
                backend = self.backend.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "reply delivered"
            ),
            Err(e) => {
                warn!(
                    request_id = %request.id(),
                    retry_count = request.retry_count(),
                    error = %e,
                    "request processing failed"
                );
                if !request.can_retry() {
                    self.notify_failure(request).await;
                }
            }
        }
        result
    }

    async fn abandon(&self, request: &Request) {
        self.notify_failure(request).await;
    }
}
