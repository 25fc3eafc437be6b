use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::collaborators::{
    AdminNotifier, ChatTarget, ContentGraphClient, GraphError, MessageHandle, MessagingClient,
    MessagingError, MessagingErrorKind, TextFormatting,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordedCall {
    Text {
        chat_id: String,
        text: String,
        formatting: TextFormatting,
    },
    Photo {
        chat_id: String,
        url: String,
        caption: String,
    },
    Video {
        chat_id: String,
        url: String,
        caption: Option<String>,
    },
    Reply {
        message_id: i64,
        text: String,
    },
    ActionControl {
        message_id: i64,
        label: String,
        url: String,
    },
}

/// Messaging double that records every call and replays queued failures.
pub(crate) struct ScriptedMessaging {
    calls: AsyncMutex<Vec<RecordedCall>>,
    failures: AsyncMutex<HashMap<&'static str, VecDeque<MessagingError>>>,
    next_message_id: AtomicI64,
}

impl ScriptedMessaging {
    pub(crate) fn new() -> Self {
        Self {
            calls: AsyncMutex::new(Vec::new()),
            failures: AsyncMutex::new(HashMap::new()),
            next_message_id: AtomicI64::new(1),
        }
    }

    pub(crate) async fn fail_next(&self, call: &'static str, kind: MessagingErrorKind, detail: &str) {
        self.failures
            .lock()
            .await
            .entry(call)
            .or_default()
            .push_back(MessagingError::new(kind, detail));
    }

    pub(crate) async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    async fn record(
        &self,
        call_name: &'static str,
        chat_id: &str,
        call: RecordedCall,
    ) -> Result<MessageHandle, MessagingError> {
        self.calls.lock().await.push(call);
        if let Some(error) = self
            .failures
            .lock()
            .await
            .get_mut(call_name)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
        })
    }
}

#[async_trait]
impl MessagingClient for ScriptedMessaging {
    async fn send_text(
        &self,
        target: &ChatTarget,
        text: &str,
        formatting: TextFormatting,
    ) -> Result<MessageHandle, MessagingError> {
        let call = RecordedCall::Text {
            chat_id: target.as_str().to_string(),
            text: text.to_string(),
            formatting,
        };
        self.record("text", target.as_str(), call).await
    }

    async fn send_photo(
        &self,
        target: &ChatTarget,
        url: &str,
        caption: &str,
    ) -> Result<MessageHandle, MessagingError> {
        let call = RecordedCall::Photo {
            chat_id: target.as_str().to_string(),
            url: url.to_string(),
            caption: caption.to_string(),
        };
        self.record("photo", target.as_str(), call).await
    }

    async fn send_video(
        &self,
        target: &ChatTarget,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageHandle, MessagingError> {
        let call = RecordedCall::Video {
            chat_id: target.as_str().to_string(),
            url: url.to_string(),
            caption: caption.map(str::to_string),
        };
        self.record("video", target.as_str(), call).await
    }

    async fn attach_action_control(
        &self,
        handle: &MessageHandle,
        label: &str,
        url: &str,
    ) -> Result<(), MessagingError> {
        let call = RecordedCall::ActionControl {
            message_id: handle.message_id,
            label: label.to_string(),
            url: url.to_string(),
        };
        self.record("attach", &handle.chat_id, call).await.map(|_| ())
    }

    async fn reply_quoted(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<MessageHandle, MessagingError> {
        let call = RecordedCall::Reply {
            message_id: handle.message_id,
            text: text.to_string(),
        };
        self.record("reply", &handle.chat_id, call).await
    }
}

#[derive(Default)]
pub(crate) struct RecordingAdmin {
    notices: AsyncMutex<Vec<String>>,
    failing: bool,
}

impl RecordingAdmin {
    pub(crate) fn failing() -> Self {
        Self {
            notices: AsyncMutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(crate) async fn notices(&self) -> Vec<String> {
        self.notices.lock().await.clone()
    }
}

#[async_trait]
impl AdminNotifier for RecordingAdmin {
    async fn notify(&self, text: &str) -> Result<(), MessagingError> {
        if self.failing {
            return Err(MessagingError::new(
                MessagingErrorKind::Unauthorized,
                "chat not found",
            ));
        }
        self.notices.lock().await.push(text.to_string());
        Ok(())
    }
}

/// Graph double returning a fixed payload or error.
pub(crate) struct StaticGraph {
    response: Result<Value, GraphError>,
    requested: AsyncMutex<Vec<String>>,
}

impl StaticGraph {
    pub(crate) fn returning(payload: Value) -> Self {
        Self {
            response: Ok(payload),
            requested: AsyncMutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(detail: &str) -> Self {
        Self {
            response: Err(GraphError::new(detail)),
            requested: AsyncMutex::new(Vec::new()),
        }
    }

    pub(crate) async fn requested(&self) -> Vec<String> {
        self.requested.lock().await.clone()
    }
}

#[async_trait]
impl ContentGraphClient for StaticGraph {
    async fn fetch_post(&self, post_id: &str) -> Result<Value, GraphError> {
        self.requested.lock().await.push(post_id.to_string());
        self.response.clone()
    }
}
