// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived cache of recently seen messages.
//!
//! Chat transports only tell us the id of a quoted message, so every inbound
//! and assistant-sent message is remembered here for a while. Entries are
//! kept in insertion order: reinserting an id moves it to the back, and once
//! the cache is over capacity the front is evicted. Expired entries are swept
//! on every insert and are never returned by [`MessageCache::get`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use linnet_config::model::MessageCacheConfig;
use linnet_core::{MessageBody, MessageId, MessageKind};
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

/// Summary of one cached message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    kind: MessageKind,
    text: Option<String>,
    media_locator: Option<String>,
    inserted_at: Instant,
}

impl CachedMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Text, Some(text.into()), None)
    }

    /// An image; `locator` is set only for images the assistant produced.
    pub fn image(locator: Option<String>) -> Self {
        Self::new(MessageKind::Image, None, locator)
    }

    pub fn other(kind: MessageKind) -> Self {
        Self::new(kind, None, None)
    }

    /// Summary of an inbound message body.
    pub fn from_body(body: &MessageBody) -> Self {
        match body {
            MessageBody::Text { text } => Self::text(text.clone()),
            MessageBody::Image => Self::image(None),
            other => Self::other(other.kind()),
        }
    }

    fn new(kind: MessageKind, text: Option<String>, media_locator: Option<String>) -> Self {
        Self {
            kind,
            text,
            media_locator,
            inserted_at: Instant::now(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn media_locator(&self) -> Option<&str> {
        self.media_locator.as_deref()
    }

    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }
}

/// Cache snapshot for health reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageCacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<MessageId, (u64, CachedMessage)>,
    order: BTreeMap<u64, MessageId>,
    next_seq: u64,
}

impl Inner {
    fn remove(&mut self, id: &MessageId) -> Option<CachedMessage> {
        let (seq, entry) = self.entries.remove(id)?;
        self.order.remove(&seq);
        Some(entry)
    }

    fn pop_oldest(&mut self) -> Option<MessageId> {
        let (_, id) = self.order.pop_first()?;
        self.entries.remove(&id);
        Some(id)
    }

    fn oldest(&self) -> Option<&CachedMessage> {
        let (_, id) = self.order.first_key_value()?;
        self.entries.get(id).map(|(_, entry)| entry)
    }
}

/// Capacity- and TTL-bounded map from message id to [`CachedMessage`].
#[derive(Debug)]
pub struct MessageCache {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl MessageCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn from_config(config: &MessageCacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    /// Inserts or replaces `id`, moving it to the back of the eviction order.
    pub fn put(&self, id: MessageId, entry: CachedMessage) {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = self.sweep_expired(&mut inner, now);

        inner.remove(&id);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, id.clone());
        inner.entries.insert(id, (seq, entry));

        let mut evicted = 0;
        while inner.entries.len() > self.capacity {
            if inner.pop_oldest().is_none() {
                break;
            }
            evicted += 1;
        }

        if expired > 0 || evicted > 0 {
            debug!(
                expired,
                evicted,
                size = inner.entries.len(),
                "message cache trimmed"
            );
        }
    }

    /// Looks up `id`; unknown and expired ids both yield `None`.
    pub fn get(&self, id: &MessageId) -> Option<CachedMessage> {
        let now = Instant::now();
        let inner = self.lock();
        let (_, entry) = inner.entries.get(id)?;
        if self.is_expired(entry, now) {
            return None;
        }
        Some(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        let cleared = inner.entries.len();
        *inner = Inner::default();
        debug!(cleared, "message cache cleared");
    }

    pub fn stats(&self) -> MessageCacheStats {
        MessageCacheStats {
            size: self.len(),
            max_size: self.capacity,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Entries are ordered by insertion time, so the sweep stops at the first live one.
    fn sweep_expired(&self, inner: &mut Inner, now: Instant) -> usize {
        let mut removed = 0;
        while inner
            .oldest()
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            inner.pop_oldest();
            removed += 1;
        }
        removed
    }

    fn is_expired(&self, entry: &CachedMessage, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) > self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MessageId {
        MessageId::from(s)
    }

    #[tokio::test(start_paused = true)]
    async fn stores_and_returns_text() {
        let cache = MessageCache::new(10, Duration::from_secs(60));
        cache.put(id("m1"), CachedMessage::text("hello"));

        let entry = cache.get(&id("m1")).expect("cached");
        assert_eq!(entry.kind(), MessageKind::Text);
        assert_eq!(entry.text_content(), Some("hello"));
        assert_eq!(entry.media_locator(), None);
        assert!(cache.get(&id("m99")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn body_conversion_keeps_text_only_for_text() {
        let text = CachedMessage::from_body(&MessageBody::Text {
            text: "hi".to_string(),
        });
        assert_eq!(text.text_content(), Some("hi"));

        let sticker = CachedMessage::from_body(&MessageBody::Sticker);
        assert_eq!(sticker.kind(), MessageKind::Sticker);
        assert_eq!(sticker.text_content(), None);

        let image = CachedMessage::from_body(&MessageBody::Image);
        assert_eq!(image.kind(), MessageKind::Image);
        assert_eq!(image.media_locator(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reinsertion_moves_entry_to_back() {
        let cache = MessageCache::new(2, Duration::from_secs(60));
        cache.put(id("a"), CachedMessage::text("1"));
        cache.put(id("b"), CachedMessage::text("2"));
        cache.put(id("a"), CachedMessage::text("3"));
        cache.put(id("c"), CachedMessage::text("4"));

        assert!(cache.get(&id("b")).is_none(), "b is now the oldest");
        assert_eq!(cache.get(&id("a")).unwrap().text_content(), Some("3"));
        assert!(cache.get(&id("c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_not_returned_before_sweep() {
        let cache = MessageCache::new(10, Duration::from_secs(60));
        cache.put(id("m1"), CachedMessage::text("hello"));
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(cache.get(&id("m1")).is_none());
        // Still physically present until the next insert sweeps it.
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_sweeps_expired_entries() {
        let cache = MessageCache::new(10, Duration::from_secs(60));
        cache.put(id("old1"), CachedMessage::text("a"));
        cache.put(id("old2"), CachedMessage::text("b"));
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.put(id("young"), CachedMessage::text("c"));
        tokio::time::advance(Duration::from_secs(31)).await;

        cache.put(id("new"), CachedMessage::text("d"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&id("young")).is_some());
        assert!(cache.get(&id("new")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_and_stats() {
        let cache = MessageCache::new(5, Duration::from_secs(3600));
        cache.put(id("a"), CachedMessage::image(Some("https://img/1.png".into())));
        cache.put(id("b"), CachedMessage::other(MessageKind::Video));

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 5);
        assert_eq!(stats.ttl_secs, 3600);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&id("a")).is_none());
    }
}
