// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-oriented stand-in transport.
//!
//! Inbound events arrive as one JSON [`InboundEvent`] per line; every reply
//! or push is written as one JSON object per line.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use linnet_core::{InboundEvent, LinnetError, MessageId, ReplyChannel};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Outbound<'a> {
    Reply {
        reply_token: &'a str,
        message_id: &'a MessageId,
        text: &'a str,
    },
    Push {
        to: &'a str,
        message_id: &'a MessageId,
        text: &'a str,
    },
}

/// Writes outbound messages as JSON lines to `W`.
pub struct ConsoleReplyChannel<W> {
    out: Mutex<W>,
    next_id: AtomicU64,
}

impl<W: AsyncWrite + Unpin + Send> ConsoleReplyChannel<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn allocate_id(&self) -> MessageId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        MessageId::new(format!("out-{n}"))
    }

    async fn write(&self, line: &Outbound<'_>) -> Result<(), LinnetError> {
        let mut encoded = serde_json::to_vec(line)
            .map_err(|e| LinnetError::Internal(format!("encode outbound line: {e}")))?;
        encoded.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&encoded).await.map_err(channel_error)?;
        out.flush().await.map_err(channel_error)
    }
}

fn channel_error(e: std::io::Error) -> LinnetError {
    LinnetError::Channel {
        message: "write to output failed".to_string(),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReplyChannel for ConsoleReplyChannel<W> {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<Option<MessageId>, LinnetError> {
        let id = self.allocate_id();
        self.write(&Outbound::Reply {
            reply_token,
            message_id: &id,
            text,
        })
        .await?;
        Ok(Some(id))
    }

    async fn push(&self, to: &str, text: &str) -> Result<Option<MessageId>, LinnetError> {
        let id = self.allocate_id();
        self.write(&Outbound::Push {
            to,
            message_id: &id,
            text,
        })
        .await?;
        Ok(Some(id))
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_event_line(line: &str) -> Result<Option<InboundEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[cfg(test)]
mod tests {
    use linnet_core::{EventKind, MessageBody};

    use super::*;

    #[tokio::test]
    async fn replies_and_pushes_are_json_lines() {
        let channel = ConsoleReplyChannel::new(Vec::new());
        let first = channel.reply("tok-1", "hello").await.unwrap();
        let second = channel.push("C42", "again").await.unwrap();
        assert_eq!(first, Some(MessageId::new("out-1")));
        assert_eq!(second, Some(MessageId::new("out-2")));

        let written = String::from_utf8(channel.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "reply");
        assert_eq!(lines[0]["reply_token"], "tok-1");
        assert_eq!(lines[0]["message_id"], "out-1");
        assert_eq!(lines[1]["type"], "push");
        assert_eq!(lines[1]["to"], "C42");
        assert_eq!(lines[1]["text"], "again");
    }

    #[test]
    fn parses_text_message_event() {
        let line = r#"{"type":"message","reply_token":"r1","sender":"U0123456789abcdef0123456789abcdef","message":{"id":"m1","type":"text","text":"!hej hi"}}"#;
        let event = parse_event_line(line).unwrap().unwrap();
        assert_eq!(event.kind, EventKind::Message);
        let message = event.message.unwrap();
        assert_eq!(message.body, MessageBody::Text { text: "!hej hi".into() });
        assert!(message.quoted_message_id.is_none());
    }

    #[test]
    fn blank_lines_are_skipped_and_garbage_rejected() {
        assert!(parse_event_line("   ").unwrap().is_none());
        assert!(parse_event_line("{not json").is_err());
    }
}
