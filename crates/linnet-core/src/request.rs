// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queued inference job and its construction-time validation.
//!
//! A [`Request`] can only be obtained through [`RequestBuilder::build`], which
//! trims and bounds the prompt and checks both identities against the
//! user/group/room shapes. Once built, the only mutation is the retry counter,
//! which the queue worker bumps before re-enqueueing a failed attempt.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::LinnetError;
use crate::types::{Identity, MessageId};

/// Maximum prompt length in characters, measured after trimming.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Default number of additional attempts after a processing failure.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Opaque, never-reused identifier of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Media referenced by the message a request quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum QuotedMedia {
    /// Media the assistant produced itself, resolvable through a locator (URL).
    Locator(String),
    /// Media a user sent, resolvable only through the transport by message id.
    Message(MessageId),
}

/// One inference task waiting in, or being processed by, the queue.
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    user: Identity,
    conversation: Identity,
    prompt: String,
    system_prompt: String,
    quoted_text: Option<String>,
    quoted_media: Option<QuotedMedia>,
    history: Option<String>,
    search_results: Option<String>,
    reply_token: Option<String>,
    created_at: DateTime<Utc>,
    created_instant: Instant,
    priority: i32,
    max_retries: u32,
    retry_count: u32,
}

impl Request {
    /// Starts building a request for `user` in `conversation`.
    pub fn builder(
        user: impl Into<String>,
        conversation: impl Into<String>,
        prompt: impl Into<String>,
    ) -> RequestBuilder {
        RequestBuilder::new(user.into(), conversation.into(), prompt.into())
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn user(&self) -> &Identity {
        &self.user
    }

    pub fn conversation(&self) -> &Identity {
        &self.conversation
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Text of the quoted message, when the request replies to a cached text.
    pub fn quoted_text(&self) -> Option<&str> {
        self.quoted_text.as_deref()
    }

    pub fn quoted_media(&self) -> Option<&QuotedMedia> {
        self.quoted_media.as_ref()
    }

    /// Rendered recent conversation, oldest first.
    pub fn history(&self) -> Option<&str> {
        self.history.as_deref()
    }

    pub fn search_results(&self) -> Option<&str> {
        self.search_results.as_deref()
    }

    pub fn reply_token(&self) -> Option<&str> {
        self.reply_token.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Time elapsed since the request was built.
    pub fn age(&self) -> Duration {
        self.created_instant.elapsed()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Records a failed attempt. Returns `false` (and leaves the counter
    /// untouched) once the retry budget is exhausted.
    pub fn increment_retry(&mut self) -> bool {
        if !self.can_retry() {
            return false;
        }
        self.retry_count += 1;
        true
    }

    pub fn is_multimodal(&self) -> bool {
        self.quoted_media.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.quoted_text.is_some() || self.quoted_media.is_some()
    }

    /// Log-safe summary of the request.
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            request_id: self.id,
            user: self.user.masked(),
            conversation: self.conversation.masked(),
            prompt_chars: self.prompt.chars().count(),
            has_quoted_text: self.quoted_text.is_some(),
            has_quoted_media: self.quoted_media.is_some(),
            has_history: self.history.is_some(),
            has_search_results: self.search_results.is_some(),
            created_at: self.created_at,
            priority: self.priority,
            retry_count: self.retry_count,
        }
    }
}

/// Serializable, identity-masked view of a request for logs and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub request_id: RequestId,
    pub user: String,
    pub conversation: String,
    pub prompt_chars: usize,
    pub has_quoted_text: bool,
    pub has_quoted_media: bool,
    pub has_history: bool,
    pub has_search_results: bool,
    pub created_at: DateTime<Utc>,
    pub priority: i32,
    pub retry_count: u32,
}

/// Builder for [`Request`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    user: String,
    conversation: String,
    prompt: String,
    system_prompt: String,
    quoted_text: Option<String>,
    quoted_media: Option<QuotedMedia>,
    history: Option<String>,
    search_results: Option<String>,
    reply_token: Option<String>,
    priority: i32,
    max_retries: u32,
}

impl RequestBuilder {
    fn new(user: String, conversation: String, prompt: String) -> Self {
        Self {
            user,
            conversation,
            prompt,
            system_prompt: String::new(),
            quoted_text: None,
            quoted_media: None,
            history: None,
            search_results: None,
            reply_token: None,
            priority: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn quoted_text(mut self, text: Option<String>) -> Self {
        self.quoted_text = non_empty(text);
        self
    }

    pub fn quoted_media(mut self, media: Option<QuotedMedia>) -> Self {
        self.quoted_media = media;
        self
    }

    /// Sets the rendered conversation history; an empty render means "no context".
    pub fn history(mut self, history: Option<String>) -> Self {
        self.history = non_empty(history);
        self
    }

    pub fn search_results(mut self, results: Option<String>) -> Self {
        self.search_results = non_empty(results);
        self
    }

    pub fn reply_token(mut self, token: Option<String>) -> Self {
        self.reply_token = non_empty(token);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validates all fields and produces the request.
    ///
    /// Fails when the trimmed prompt is empty or longer than
    /// [`MAX_PROMPT_CHARS`], when the sender is not a user id, or when the
    /// conversation is not a user, group or room id.
    pub fn build(self) -> Result<Request, LinnetError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(LinnetError::validation(
                "prompt",
                "must not be empty or whitespace",
            ));
        }
        let prompt_chars = prompt.chars().count();
        if prompt_chars > MAX_PROMPT_CHARS {
            return Err(LinnetError::validation(
                "prompt",
                format!("{prompt_chars} characters exceeds the maximum of {MAX_PROMPT_CHARS}"),
            ));
        }

        let user = Identity::parse_user(&self.user).map_err(|e| relabel(e, "user"))?;
        let conversation =
            Identity::parse(&self.conversation).map_err(|e| relabel(e, "conversation"))?;

        Ok(Request {
            id: RequestId::generate(),
            user,
            conversation,
            prompt: prompt.to_string(),
            system_prompt: self.system_prompt,
            quoted_text: self.quoted_text,
            quoted_media: self.quoted_media,
            history: self.history,
            search_results: self.search_results,
            reply_token: self.reply_token,
            created_at: Utc::now(),
            created_instant: Instant::now(),
            priority: self.priority,
            max_retries: self.max_retries,
            retry_count: 0,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn relabel(err: LinnetError, field: &'static str) -> LinnetError {
    match err {
        LinnetError::Validation { message, .. } => LinnetError::Validation { field, message },
        other => other,
    }
}
