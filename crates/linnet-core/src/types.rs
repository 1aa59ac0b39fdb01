// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the admission pipeline and its collaborators.
//!
//! Inbound payloads are modelled as tagged variants per message kind so that
//! they are validated once at the transport boundary and never re-inspected
//! as loose maps deeper in the pipeline.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LinnetError;

static USER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^U[0-9a-f]{32}$").expect("static pattern"));
static GROUP_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^C[0-9a-f]{32}$").expect("static pattern"));
static ROOM_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^R[0-9a-f]{32}$").expect("static pattern"));

/// Transport-assigned identifier of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The three disjoint identifier shapes a chat identity can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    User,
    Group,
    Room,
}

/// A validated user, group or room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    kind: IdentityKind,
    raw: String,
}

impl Identity {
    /// Parses `raw` against the user (`U…`), group (`C…`) and room (`R…`) shapes.
    pub fn parse(raw: &str) -> Result<Self, LinnetError> {
        let kind = if USER_ID_PATTERN.is_match(raw) {
            IdentityKind::User
        } else if GROUP_ID_PATTERN.is_match(raw) {
            IdentityKind::Group
        } else if ROOM_ID_PATTERN.is_match(raw) {
            IdentityKind::Room
        } else {
            return Err(LinnetError::validation(
                "identity",
                format!("`{}` is not a user, group or room id", mask(raw)),
            ));
        };
        Ok(Self {
            kind,
            raw: raw.to_string(),
        })
    }

    /// Parses `raw` and requires it to be a user identifier.
    pub fn parse_user(raw: &str) -> Result<Self, LinnetError> {
        let identity = Self::parse(raw)?;
        if identity.kind != IdentityKind::User {
            return Err(LinnetError::validation(
                "identity",
                format!("`{}` is a {} id, expected a user id", identity.masked(), identity.kind),
            ));
        }
        Ok(identity)
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Log-safe rendering showing only the first and last four characters.
    pub fn masked(&self) -> String {
        mask(&self.raw)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Identity {
    type Err = LinnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = LinnetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.raw
    }
}

/// Masks an identifier for logging, e.g. `Uabc...ef12`.
pub fn mask(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Kind of a chat message, without its payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Sticker,
    Video,
    Audio,
    File,
    Location,
    Other,
}

/// Payload of an inbound chat message, one variant per message kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Text { text: String },
    Image,
    Sticker,
    Video,
    Audio,
    File,
    Location,
    #[serde(other)]
    Unsupported,
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Image => MessageKind::Image,
            Self::Sticker => MessageKind::Sticker,
            Self::Video => MessageKind::Video,
            Self::Audio => MessageKind::Audio,
            Self::File => MessageKind::File,
            Self::Location => MessageKind::Location,
            Self::Unsupported => MessageKind::Other,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A chat message carried by a `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    #[serde(flatten)]
    pub body: MessageBody,
    /// Identifier of the message this one replies to / quotes.
    #[serde(default)]
    pub quoted_message_id: Option<MessageId>,
}

/// Kind of an inbound transport event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Message,
    Follow,
    Unfollow,
    Join,
    Leave,
    Postback,
    #[serde(other)]
    Other,
}

/// A parsed, already-authenticated event handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Short-lived token for replying to this event.
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Raw sender identity as reported by the transport.
    #[serde(default)]
    pub sender: Option<String>,
    /// Raw group/room identity; absent for one-to-one chats.
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

impl InboundEvent {
    /// The conversation to address: the group/room, else the sender for one-to-one chats.
    pub fn conversation_or_sender(&self) -> Option<&str> {
        self.conversation.as_deref().or(self.sender.as_deref())
    }
}

/// Health status reported by collaborator health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "U0123456789abcdef0123456789abcdef";
    const GROUP: &str = "C0123456789abcdef0123456789abcdef";
    const ROOM: &str = "R0123456789abcdef0123456789abcdef";

    #[test]
    fn identity_shapes_are_disjoint() {
        assert_eq!(Identity::parse(USER).unwrap().kind(), IdentityKind::User);
        assert_eq!(Identity::parse(GROUP).unwrap().kind(), IdentityKind::Group);
        assert_eq!(Identity::parse(ROOM).unwrap().kind(), IdentityKind::Room);
    }

    #[test]
    fn malformed_identities_are_rejected() {
        for bad in [
            "",
            "U123",
            "X0123456789abcdef0123456789abcdef",
            "U0123456789ABCDEF0123456789ABCDEF",
            "U0123456789abcdef0123456789abcdef0",
        ] {
            assert!(Identity::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn parse_user_rejects_groups() {
        assert!(Identity::parse_user(USER).is_ok());
        let err = Identity::parse_user(GROUP).unwrap_err();
        assert!(matches!(err, LinnetError::Validation { field: "identity", .. }));
    }

    #[test]
    fn mask_hides_the_middle() {
        assert_eq!(mask(USER), "U012...cdef");
        assert_eq!(mask("short"), "***");
    }

    #[test]
    fn inbound_text_event_deserializes() {
        let json = serde_json::json!({
            "type": "message",
            "reply_token": "tok",
            "sender": USER,
            "conversation": GROUP,
            "message": {"id": "m2", "type": "text", "text": "!hej hi", "quoted_message_id": "m1"}
        });
        let event: InboundEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind, EventKind::Message);
        let message = event.message.as_ref().unwrap();
        assert_eq!(message.body.text(), Some("!hej hi"));
        assert_eq!(message.quoted_message_id, Some(MessageId::from("m1")));
        assert_eq!(event.conversation_or_sender(), Some(GROUP));
    }

    #[test]
    fn unknown_message_and_event_types_fall_back() {
        let json = serde_json::json!({
            "type": "memberJoined",
            "message": {"id": "m3", "type": "hologram"}
        });
        let event: InboundEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind, EventKind::Other);
        let message = event.message.unwrap();
        assert_eq!(message.body, MessageBody::Unsupported);
        assert_eq!(message.body.kind(), MessageKind::Other);
    }

    #[test]
    fn one_to_one_chat_uses_sender_as_conversation() {
        let event = InboundEvent {
            kind: EventKind::Message,
            reply_token: None,
            sender: Some(USER.to_string()),
            conversation: None,
            message: None,
        };
        assert_eq!(event.conversation_or_sender(), Some(USER));
    }
}
