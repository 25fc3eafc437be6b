//! Collaborator contracts consumed by the relay pipeline.
//!
//! The pipeline never talks HTTP directly. It drives a content-graph client,
//! a messaging client, and an administrator channel through the traits below;
//! concrete providers live in the `fbtg-graph` and `fbtg-telegram` crates.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Destination chat for outbound messages.
pub struct ChatTarget(String);

impl ChatTarget {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self(chat_id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Opaque reference to a message the messaging platform accepted.
pub struct MessageHandle {
    pub chat_id: String,
    pub message_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `TextFormatting` values.
pub enum TextFormatting {
    #[default]
    Plain,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Failure classes reported by a messaging provider.
pub enum MessagingErrorKind {
    Rejected,
    Timeout,
    RateLimited,
    Unauthorized,
    Unavailable,
    Transport,
    InvalidResponse,
}

impl MessagingErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Unauthorized => "unauthorized",
            Self::Unavailable => "unavailable",
            Self::Transport => "transport",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("messaging {} failure: {detail}", .kind.as_str())]
/// Error returned by a `MessagingClient` call.
pub struct MessagingError {
    pub kind: MessagingErrorKind,
    pub detail: String,
    pub http_status: Option<u16>,
}

impl MessagingError {
    pub fn new(kind: MessagingErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Bad-request and timeout failures: the provider refused or gave up on
    /// this particular payload, so a different payload may still go through.
    pub fn is_client_rejection(&self) -> bool {
        matches!(
            self.kind,
            MessagingErrorKind::Rejected | MessagingErrorKind::Timeout
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("content graph request failed: {detail}")]
/// Error returned by a `ContentGraphClient` fetch.
pub struct GraphError {
    pub detail: String,
    pub http_status: Option<u16>,
}

impl GraphError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

#[async_trait]
/// Source of raw post payloads.
pub trait ContentGraphClient: Send + Sync {
    async fn fetch_post(&self, post_id: &str) -> Result<Value, GraphError>;
}

#[async_trait]
/// Outbound capabilities of the messaging platform.
pub trait MessagingClient: Send + Sync {
    async fn send_text(
        &self,
        target: &ChatTarget,
        text: &str,
        formatting: TextFormatting,
    ) -> Result<MessageHandle, MessagingError>;

    async fn send_photo(
        &self,
        target: &ChatTarget,
        url: &str,
        caption: &str,
    ) -> Result<MessageHandle, MessagingError>;

    async fn send_video(
        &self,
        target: &ChatTarget,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageHandle, MessagingError>;

    async fn attach_action_control(
        &self,
        handle: &MessageHandle,
        label: &str,
        url: &str,
    ) -> Result<(), MessagingError>;

    async fn reply_quoted(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<MessageHandle, MessagingError>;
}

#[async_trait]
/// Diagnostic destination for fetch summaries and unrecoverable failures.
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), MessagingError>;
}

/// Administrator channel backed by a chat on the messaging platform.
pub struct AdminChannel {
    messaging: Arc<dyn MessagingClient>,
    target: ChatTarget,
}

impl AdminChannel {
    pub fn new(messaging: Arc<dyn MessagingClient>, target: ChatTarget) -> Self {
        Self { messaging, target }
    }

    pub fn target(&self) -> &ChatTarget {
        &self.target
    }
}

#[async_trait]
impl AdminNotifier for AdminChannel {
    async fn notify(&self, text: &str) -> Result<(), MessagingError> {
        self.messaging
            .send_text(&self.target, text, TextFormatting::Plain)
            .await
            .map(|_| ())
    }
}

/// Sends `text` to the administrator, logging instead of failing.
pub async fn notify_admin_best_effort(admin: &dyn AdminNotifier, text: &str) {
    if let Err(error) = admin.notify(text).await {
        tracing::warn!(
            reason = error.kind.as_str(),
            detail = %error.detail,
            "administrator notification failed"
        );
    }
}
