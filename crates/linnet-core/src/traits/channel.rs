// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound reply contract of the chat transport.

use async_trait::async_trait;

use crate::error::LinnetError;
use crate::types::MessageId;

/// Sends text back into a conversation.
///
/// Both methods return the transport id of the sent message when the
/// transport reports one, so that the reply can be cached for later quotes.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Replies using a short-lived reply token. Fails once the token expired.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<Option<MessageId>, LinnetError>;

    /// Pushes a message to a user, group or room by identity.
    async fn push(&self, to: &str, text: &str) -> Result<Option<MessageId>, LinnetError>;
}
