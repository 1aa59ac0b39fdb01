// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event handling: bookkeeping, admission and enqueueing.
//!
//! Every message event is cached and recorded in the conversation context,
//! whether or not it carries a command. Ask commands then pass the admission
//! checks (prompt present, rate limit, request validation, queue capacity)
//! and end up in the queue; every rejection is answered with a short reply to
//! the sender and never reaches the worker.

use std::sync::Arc;

use linnet_cache::{CachedMessage, MessageCache};
use linnet_config::model::LinnetConfig;
use linnet_context::ConversationContextStore;
use linnet_core::types::mask;
use linnet_core::{
    EventKind, InboundEvent, LinnetError, MessageBody, MessageKind, QuotedMedia, ReplyChannel,
    Request, RequestId, SearchProvider,
};
use linnet_limiter::RateLimiter;
use linnet_queue::QueueController;
use tracing::{debug, info, warn};

use crate::command::{Command, detect_prompt_injection, parse_command, sanitize_prompt};
use crate::messages;

/// What the dispatcher did with one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not an ask command, or not addressable; only bookkeeping happened.
    Ignored,
    /// Ask without question and without quoted content; usage hint sent.
    EmptyPrompt,
    /// Sender over the sliding-window allowance.
    RateLimited { retry_after_secs: u64 },
    /// The request failed validation.
    Invalid { field: &'static str },
    /// Queue at capacity.
    QueueFull,
    /// Admitted at `position` (1-indexed).
    Enqueued {
        request_id: RequestId,
        position: usize,
    },
}

/// Content recovered from a quoted message.
#[derive(Debug, Default)]
struct Quote {
    text: Option<String>,
    media: Option<QuotedMedia>,
}

impl Quote {
    fn is_empty(&self) -> bool {
        self.text.is_none() && self.media.is_none()
    }
}

/// Turns inbound events into queued requests.
pub struct Dispatcher {
    limiter: Arc<RateLimiter>,
    cache: Arc<MessageCache>,
    context: Arc<ConversationContextStore>,
    queue: Arc<QueueController>,
    channel: Arc<dyn ReplyChannel>,
    search: Option<Arc<dyn SearchProvider>>,
    config: LinnetConfig,
}

impl Dispatcher {
    pub fn new(
        config: LinnetConfig,
        limiter: Arc<RateLimiter>,
        cache: Arc<MessageCache>,
        context: Arc<ConversationContextStore>,
        queue: Arc<QueueController>,
        channel: Arc<dyn ReplyChannel>,
    ) -> Self {
        Self {
            limiter,
            cache,
            context,
            queue,
            channel,
            search: None,
            config,
        }
    }

    /// Enables `!web` augmentation through `search`.
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    pub fn context(&self) -> &ConversationContextStore {
        &self.context
    }

    pub fn queue(&self) -> &QueueController {
        &self.queue
    }

    /// Handles one inbound event.
    pub async fn handle_event(&self, event: InboundEvent) -> Dispatch {
        if event.kind != EventKind::Message {
            debug!(kind = %event.kind, "ignoring non-message event");
            return Dispatch::Ignored;
        }
        let Some(message) = event.message.as_ref() else {
            debug!("message event without message payload");
            return Dispatch::Ignored;
        };
        let (Some(sender), Some(conversation)) =
            (event.sender.as_deref(), event.conversation_or_sender())
        else {
            warn!(message_id = %message.id, "message event without sender, ignoring");
            return Dispatch::Ignored;
        };

        // Snapshot before recording the current message, so the history an
        // ask carries never repeats the ask itself.
        let history = self
            .context
            .render_recent(conversation, self.config.context.render_messages);

        self.cache
            .put(message.id.clone(), CachedMessage::from_body(&message.body));
        self.record_context(conversation, sender, &message.body);

        let Some(text) = message.body.text() else {
            return Dispatch::Ignored;
        };
        let command = match parse_command(text) {
            Some(Command::Unknown(keyword)) => {
                debug!(keyword = keyword.as_str(), "ignoring unknown command");
                return Dispatch::Ignored;
            }
            Some(command) => command,
            None => return Dispatch::Ignored,
        };

        let quote = match &message.quoted_message_id {
            Some(quoted_id) => self.resolve_quote(quoted_id),
            None => Quote::default(),
        };

        let argument = sanitize_prompt(command.argument().unwrap_or_default());
        if argument.is_empty() && quote.is_empty() {
            self.notify(&event, messages::EMPTY_PROMPT).await;
            return Dispatch::EmptyPrompt;
        }
        if let Some(pattern) = detect_prompt_injection(&argument) {
            warn!(
                user = %mask(sender),
                pattern,
                "possible prompt injection detected"
            );
        }

        let decision = self.limiter.check_and_record(sender);
        if !decision.allowed {
            self.notify(&event, &messages::rate_limited(decision.retry_after_secs))
                .await;
            return Dispatch::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            };
        }

        let search_results = if command.wants_search() {
            let query = if argument.is_empty() {
                quote.text.as_deref().unwrap_or_default()
            } else {
                argument.as_str()
            };
            self.search(query).await
        } else {
            None
        };

        let prompt = if argument.is_empty() {
            self.config.agent.default_prompt.clone()
        } else {
            argument
        };

        let built = Request::builder(sender, conversation, prompt)
            .system_prompt(self.config.agent.system_prompt.clone())
            .quoted_text(quote.text)
            .quoted_media(quote.media)
            .history(Some(history))
            .search_results(search_results)
            .reply_token(event.reply_token.clone())
            .max_retries(self.config.queue.max_retries)
            .build();
        let request = match built {
            Ok(request) => request,
            Err(LinnetError::Validation { field, message }) => {
                warn!(field, error = message.as_str(), "request rejected by validation");
                self.notify(&event, messages::PROCESSING_ERROR).await;
                return Dispatch::Invalid { field };
            }
            Err(e) => {
                warn!(error = %e, "request could not be built");
                self.notify(&event, messages::PROCESSING_ERROR).await;
                return Dispatch::Invalid { field: "request" };
            }
        };

        let request_id = request.id();
        debug!(summary = ?request.summary(), "request admitted");
        match self.queue.try_enqueue(request) {
            Ok(position) => {
                if self.config.agent.announce_position {
                    let wait = self.queue.estimated_wait_secs();
                    self.notify(&event, &messages::queued(position, wait)).await;
                }
                Dispatch::Enqueued {
                    request_id,
                    position,
                }
            }
            Err(e) => {
                if !matches!(e, LinnetError::QueueFull { .. }) {
                    warn!(request_id = %request_id, error = %e, "enqueue failed");
                }
                self.notify(&event, messages::QUEUE_BUSY).await;
                Dispatch::QueueFull
            }
        }
    }

    fn record_context(&self, conversation: &str, sender: &str, body: &MessageBody) {
        match body {
            MessageBody::Text { text } if !text.trim().is_empty() => {
                self.context
                    .append(conversation, sender, text, MessageKind::Text);
            }
            MessageBody::Image | MessageBody::Sticker => {
                self.context.append(conversation, sender, "", body.kind());
            }
            _ => {}
        }
    }

    fn resolve_quote(&self, quoted_id: &linnet_core::MessageId) -> Quote {
        let Some(cached) = self.cache.get(quoted_id) else {
            warn!(quoted_id = %quoted_id, "quoted message not in cache");
            return Quote::default();
        };
        match cached.kind() {
            MessageKind::Text => Quote {
                text: cached.text_content().map(str::to_string),
                media: None,
            },
            MessageKind::Image => {
                let media = match cached.media_locator() {
                    Some(locator) => QuotedMedia::Locator(locator.to_string()),
                    None => QuotedMedia::Message(quoted_id.clone()),
                };
                Quote {
                    text: None,
                    media: Some(media),
                }
            }
            other => {
                debug!(quoted_id = %quoted_id, kind = %other, "quoted message kind not usable");
                Quote::default()
            }
        }
    }

    async fn search(&self, query: &str) -> Option<String> {
        let Some(search) = &self.search else {
            debug!("no search provider configured, skipping web search");
            return None;
        };
        if query.trim().is_empty() {
            return None;
        }
        match search.search(query, self.config.search.max_results).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "web search failed, continuing without results");
                None
            }
        }
    }

    /// Best-effort reply to the event's sender: reply token first, push second.
    async fn notify(&self, event: &InboundEvent, text: &str) {
        if let Some(token) = event.reply_token.as_deref() {
            match self.channel.reply(token, text).await {
                Ok(_) => return,
                Err(e) => debug!(error = %e, "reply failed, falling back to push"),
            }
        }
        let Some(to) = event.conversation_or_sender() else {
            return;
        };
        if let Err(e) = self.channel.push(to, text).await {
            warn!(to = %mask(to), error = %e, "could not notify user");
        } else {
            info!(to = %mask(to), "user notified");
        }
    }
}
