// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-term conversation memory.
//!
//! Each conversation keeps a small ring of its latest messages, which is
//! rendered into the prompt so the backend can follow the discussion. Entries
//! expire after a TTL; a conversation whose entries have all expired is
//! dropped on the next append.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use linnet_config::model::ContextConfig;
use linnet_core::MessageKind;
use linnet_core::types::mask;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

/// Identities with this prefix belong to the assistant and render as `Bot`.
pub const ASSISTANT_PREFIX: &str = "BOT_";

/// One remembered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub identity: String,
    /// Message text; empty for non-text kinds.
    pub text: String,
    pub kind: MessageKind,
    pub recorded_at: Instant,
}

impl ContextEntry {
    /// Speaker label used in rendered history.
    pub fn speaker(&self) -> String {
        if self.identity.starts_with(ASSISTANT_PREFIX) {
            "Bot".to_string()
        } else {
            let short: String = self.identity.chars().take(4).collect();
            format!("User_{short}")
        }
    }

    /// Text or placeholder, cut to `max_chars` characters plus an ellipsis.
    pub fn display_text(&self, max_chars: usize) -> String {
        match self.kind {
            MessageKind::Text => truncate(&self.text, max_chars),
            MessageKind::Image => "[sent an image]".to_string(),
            MessageKind::Sticker => "[sent a sticker]".to_string(),
            other => format!("[sent a {other}]"),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Context store snapshot for health reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub conversations_tracked: usize,
    pub total_messages: usize,
    pub max_messages_per_conversation: usize,
    pub ttl_secs: u64,
}

/// Per-conversation bounded history.
#[derive(Debug)]
pub struct ConversationContextStore {
    max_messages: usize,
    ttl: Duration,
    max_entry_chars: usize,
    conversations: Mutex<HashMap<String, VecDeque<ContextEntry>>>,
}

impl ConversationContextStore {
    pub fn new(max_messages: usize, ttl: Duration, max_entry_chars: usize) -> Self {
        Self {
            max_messages,
            ttl,
            max_entry_chars,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_messages, config.ttl(), config.max_entry_chars)
    }

    /// Records a message, evicting the oldest one at capacity, then purges
    /// expired entries across all conversations.
    pub fn append(&self, conversation: &str, identity: &str, text: &str, kind: MessageKind) {
        let now = Instant::now();
        let mut conversations = self.lock();

        let ring = conversations
            .entry(conversation.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.max_messages));
        ring.push_back(ContextEntry {
            identity: identity.to_string(),
            text: text.to_string(),
            kind,
            recorded_at: now,
        });
        while ring.len() > self.max_messages {
            ring.pop_front();
        }
        let held = ring.len();

        conversations.retain(|_, ring| {
            ring.retain(|entry| !self.is_expired(entry, now));
            !ring.is_empty()
        });

        debug!(
            conversation = %mask(conversation),
            kind = %kind,
            held,
            tracked = conversations.len(),
            "conversation context updated"
        );
    }

    /// Up to `max` unexpired entries, oldest first.
    pub fn recent(&self, conversation: &str, max: usize) -> Vec<ContextEntry> {
        let now = Instant::now();
        let conversations = self.lock();
        let Some(ring) = conversations.get(conversation) else {
            return Vec::new();
        };
        let live: Vec<&ContextEntry> = ring
            .iter()
            .filter(|entry| !self.is_expired(entry, now))
            .collect();
        let skip = live.len().saturating_sub(max);
        live.into_iter().skip(skip).cloned().collect()
    }

    /// Renders recent history as `speaker: text` lines; empty when there is none.
    pub fn render_recent(&self, conversation: &str, max: usize) -> String {
        self.recent(conversation, max)
            .iter()
            .map(|entry| {
                format!(
                    "{}: {}",
                    entry.speaker(),
                    entry.display_text(self.max_entry_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&self, conversation: &str) {
        self.lock().remove(conversation);
    }

    pub fn clear_all(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> ContextStats {
        let conversations = self.lock();
        ContextStats {
            conversations_tracked: conversations.len(),
            total_messages: conversations.values().map(VecDeque::len).sum(),
            max_messages_per_conversation: self.max_messages,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    fn is_expired(&self, entry: &ContextEntry, now: Instant) -> bool {
        now.duration_since(entry.recorded_at) > self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<ContextEntry>>> {
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: &str = "C0123456789abcdef0123456789abcdef";
    const OTHER_GROUP: &str = "Cfedcba9876543210fedcba9876543210";
    const ALICE: &str = "Uaaaa456789abcdef0123456789abcdef";
    const BOB: &str = "Ubbbb456789abcdef0123456789abcdef";

    fn store() -> ConversationContextStore {
        ConversationContextStore::from_config(&ContextConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn untouched_conversation_renders_empty() {
        let store = store();
        assert_eq!(store.render_recent(GROUP, 5), "");
        assert!(store.recent(GROUP, 5).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_latest_entries_in_order() {
        let store = store();
        for text in ["one", "two", "three", "four", "five"] {
            store.append(GROUP, ALICE, text, MessageKind::Text);
        }
        let texts: Vec<String> = store
            .recent(GROUP, 10)
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, vec!["three", "four", "five"]);
    }

    #[tokio::test(start_paused = true)]
    async fn renders_speakers_and_placeholders() {
        let store = ConversationContextStore::new(5, Duration::from_secs(3600), 200);
        store.append(GROUP, ALICE, "hello there", MessageKind::Text);
        store.append(GROUP, BOB, "", MessageKind::Image);
        store.append(GROUP, ALICE, "", MessageKind::Sticker);
        store.append(GROUP, "BOT_linnet", "hi!", MessageKind::Text);
        store.append(GROUP, BOB, "", MessageKind::Video);

        assert_eq!(
            store.render_recent(GROUP, 5),
            "User_Uaaa: hello there\n\
             User_Ubbb: [sent an image]\n\
             User_Uaaa: [sent a sticker]\n\
             Bot: hi!\n\
             User_Ubbb: [sent a video]"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn render_respects_max() {
        let store = store();
        store.append(GROUP, ALICE, "a", MessageKind::Text);
        store.append(GROUP, BOB, "b", MessageKind::Text);
        assert_eq!(store.render_recent(GROUP, 1), "User_Ubbb: b");
        assert_eq!(store.render_recent(GROUP, 0), "");
    }

    #[tokio::test(start_paused = true)]
    async fn long_entries_are_truncated() {
        let store = ConversationContextStore::new(3, Duration::from_secs(60), 5);
        store.append(GROUP, ALICE, "abcdefgh", MessageKind::Text);
        store.append(GROUP, BOB, "åäöåä", MessageKind::Text);
        assert_eq!(
            store.render_recent(GROUP, 5),
            "User_Uaaa: abcde…\nUser_Ubbb: åäöåä"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_hidden_and_purged() {
        let store = ConversationContextStore::new(3, Duration::from_secs(60), 200);
        store.append(GROUP, ALICE, "old", MessageKind::Text);
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.render_recent(GROUP, 5), "");
        assert_eq!(store.stats().conversations_tracked, 1);

        store.append(OTHER_GROUP, BOB, "new", MessageKind::Text);
        let stats = store.stats();
        assert_eq!(stats.conversations_tracked, 1);
        assert_eq!(stats.total_messages, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_and_clear_all() {
        let store = store();
        store.append(GROUP, ALICE, "a", MessageKind::Text);
        store.append(OTHER_GROUP, BOB, "b", MessageKind::Text);

        store.clear(GROUP);
        assert_eq!(store.render_recent(GROUP, 5), "");
        assert_eq!(store.render_recent(OTHER_GROUP, 5), "User_Ubbb: b");

        store.clear_all();
        let stats = store.stats();
        assert_eq!(stats.conversations_tracked, 0);
        assert_eq!(stats.max_messages_per_conversation, 3);
        assert_eq!(stats.ttl_secs, 3600);
    }
}
