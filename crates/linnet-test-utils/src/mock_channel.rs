// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reply channel capturing outbound messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use linnet_core::{LinnetError, MessageId, ReplyChannel};
use tokio::sync::Mutex;

/// How a captured message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Reply,
    Push,
}

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub delivery: Delivery,
    /// Reply token for replies, identity for pushes.
    pub target: String,
    pub text: String,
    pub id: Option<MessageId>,
}

/// A reply channel that records what it was asked to send.
///
/// Replies and pushes can be made to fail independently. Successful sends
/// return ids `sent-1`, `sent-2`, ... unless id reporting is switched off.
pub struct MockReplyChannel {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_reply: AtomicBool,
    fail_push: AtomicBool,
    report_ids: AtomicBool,
    next_id: AtomicU64,
}

impl MockReplyChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_reply: AtomicBool::new(false),
            fail_push: AtomicBool::new(false),
            report_ids: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn fail_replies(&self, fail: bool) {
        self.fail_reply.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn report_ids(&self, report: bool) {
        self.report_ids.store(report, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts of all successful sends, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    async fn record(
        &self,
        delivery: Delivery,
        target: &str,
        text: &str,
    ) -> Result<Option<MessageId>, LinnetError> {
        let failing = match delivery {
            Delivery::Reply => &self.fail_reply,
            Delivery::Push => &self.fail_push,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(LinnetError::channel(format!("mock {delivery:?} failure")));
        }
        let id = self.report_ids.load(Ordering::SeqCst).then(|| {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            MessageId::new(format!("sent-{n}"))
        });
        self.sent.lock().await.push(SentMessage {
            delivery,
            target: target.to_string(),
            text: text.to_string(),
            id: id.clone(),
        });
        Ok(id)
    }
}

impl Default for MockReplyChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyChannel for MockReplyChannel {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<Option<MessageId>, LinnetError> {
        self.record(Delivery::Reply, reply_token, text).await
    }

    async fn push(&self, to: &str, text: &str) -> Result<Option<MessageId>, LinnetError> {
        self.record(Delivery::Push, to, text).await
    }
}
