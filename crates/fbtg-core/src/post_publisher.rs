//! Fetch → parse → deliver → annotate orchestration for one post id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::caption_split::DEFAULT_CAPTION_LIMIT;
use crate::collaborators::{
    notify_admin_best_effort, AdminNotifier, ChatTarget, ContentGraphClient, MessageHandle,
    MessagingClient,
};
use crate::delivery_engine::{DeliveryOutcome, MediaDeliveryEngine};
use crate::post_model::{parse_post_payload, NormalizedPost, PostKind, PostModelError};

pub const DEFAULT_ACTION_LABEL: &str = "View original post";
const ADMIN_PAYLOAD_PREVIEW_CHARS: usize = 512;

#[derive(Debug, Clone)]
/// Public struct `PublisherConfig` used by the relay entry points.
pub struct PublisherConfig {
    pub channel: ChatTarget,
    pub caption_limit: usize,
    pub action_label: String,
}

impl PublisherConfig {
    pub fn new(channel: ChatTarget) -> Self {
        Self {
            channel,
            caption_limit: DEFAULT_CAPTION_LIMIT,
            action_label: DEFAULT_ACTION_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Error)]
/// Enumerates supported `PublishError` values.
pub enum PublishError {
    #[error("post id must not be empty")]
    EmptyPostId,
    #[error("post id {post_id:?} may only contain ASCII letters, digits and underscores")]
    InvalidPostId { post_id: String },
    #[error("could not fetch post {post_id}: {detail}")]
    FetchFailed { post_id: String, detail: String },
    #[error("malformed post {post_id}: {source}")]
    MalformedPost {
        post_id: String,
        #[source]
        source: PostModelError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `PublishStatus` values.
pub enum PublishStatus {
    Delivered,
    DeliveryFailed,
}

#[derive(Debug, Clone, Serialize)]
/// Summary of one publish cycle.
pub struct PublishReport {
    pub post_id: String,
    pub kind: PostKind,
    pub status: PublishStatus,
    pub delivery: DeliveryOutcome,
    pub action_control_attached: bool,
    pub completed_at: DateTime<Utc>,
}

/// Relays one content-graph post into the configured channel.
pub struct PostPublisher {
    graph: Arc<dyn ContentGraphClient>,
    messaging: Arc<dyn MessagingClient>,
    admin: Arc<dyn AdminNotifier>,
    engine: MediaDeliveryEngine,
    config: PublisherConfig,
}

impl PostPublisher {
    pub fn new(
        graph: Arc<dyn ContentGraphClient>,
        messaging: Arc<dyn MessagingClient>,
        admin: Arc<dyn AdminNotifier>,
        config: PublisherConfig,
    ) -> Self {
        let engine = MediaDeliveryEngine::new(messaging.clone(), admin.clone(), config.caption_limit);
        Self {
            graph,
            messaging,
            admin,
            engine,
            config,
        }
    }

    pub async fn publish(&self, post_id: &str) -> Result<PublishReport, PublishError> {
        let post_id = post_id.trim();
        if post_id.is_empty() {
            return Err(PublishError::EmptyPostId);
        }
        if !is_graph_object_id(post_id) {
            tracing::warn!(post_id, "post id rejected before fetch");
            return Err(PublishError::InvalidPostId {
                post_id: post_id.to_string(),
            });
        }

        let payload = self.fetch_and_summarize(post_id).await?;
        let post = match parse_post_payload(&payload) {
            Ok(post) => post,
            Err(error) => {
                tracing::error!(post_id, detail = %error, "post payload rejected");
                notify_admin_best_effort(
                    self.admin.as_ref(),
                    &format!("Could not parse post {post_id}: {error}"),
                )
                .await;
                return Err(PublishError::MalformedPost {
                    post_id: post_id.to_string(),
                    source: error,
                });
            }
        };
        tracing::info!(post_id, kind = post.kind().as_str(), "post normalized");

        let delivery = self.engine.deliver(&post, &self.config.channel).await;
        let action_control_attached = match delivery.message_handle.as_ref() {
            Some(handle) => self.attach_view_original(&post, handle).await,
            None => false,
        };
        let status = if delivery.succeeded {
            PublishStatus::Delivered
        } else {
            PublishStatus::DeliveryFailed
        };
        Ok(PublishReport {
            post_id: post_id.to_string(),
            kind: post.kind(),
            status,
            delivery,
            action_control_attached,
            completed_at: Utc::now(),
        })
    }

    async fn fetch_and_summarize(&self, post_id: &str) -> Result<Value, PublishError> {
        match self.graph.fetch_post(post_id).await {
            Ok(payload) => {
                tracing::info!(post_id, "post fetched");
                notify_admin_best_effort(
                    self.admin.as_ref(),
                    &format!("Fetched post {post_id}: {}", compact_payload(&payload)),
                )
                .await;
                Ok(payload)
            }
            Err(error) => {
                tracing::error!(post_id, detail = %error.detail, "post fetch failed");
                notify_admin_best_effort(
                    self.admin.as_ref(),
                    &format!("Could not fetch post {post_id}:\n{}", error.detail),
                )
                .await;
                Err(PublishError::FetchFailed {
                    post_id: post_id.to_string(),
                    detail: error.detail,
                })
            }
        }
    }

    async fn attach_view_original(&self, post: &NormalizedPost, handle: &MessageHandle) -> bool {
        let Some(permalink) = post.permalink() else {
            tracing::debug!(
                post_id = post.display_id(),
                "post has no permalink, skipping action control"
            );
            return false;
        };
        match self
            .messaging
            .attach_action_control(handle, &self.config.action_label, permalink)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    post_id = post.display_id(),
                    reason = error.kind.as_str(),
                    detail = %error.detail,
                    "action control attach failed"
                );
                false
            }
        }
    }
}

/// Graph object ids are `{page}_{post}` or bare numeric ids.
fn is_graph_object_id(post_id: &str) -> bool {
    post_id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn compact_payload(value: &Value) -> String {
    let serialized = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    if serialized.chars().count() <= ADMIN_PAYLOAD_PREVIEW_CHARS {
        return serialized;
    }
    let mut output: String = serialized.chars().take(ADMIN_PAYLOAD_PREVIEW_CHARS).collect();
    output.push_str("...");
    output
}
