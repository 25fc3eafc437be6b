//! Execution of delivery plans against the messaging platform.
//!
//! Each attempt resolves to one of three verdicts: success, a soft failure
//! that moves on to the next attempt, or a hard failure that ends the chain.
//! Hard failures are escalated to the administrator channel here and never
//! surface to the caller as errors.

use std::sync::Arc;

use serde::Serialize;

use crate::collaborators::{
    notify_admin_best_effort, AdminNotifier, ChatTarget, MessageHandle, MessagingClient,
    MessagingError, TextFormatting,
};
use crate::delivery_strategy::{
    select_delivery_strategy, DeliveryAction, DeliveryAttempt, DeliveryPlan, DeliveryStrategy,
};
use crate::post_model::NormalizedPost;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Result of delivering one post.
pub struct DeliveryOutcome {
    pub strategy: DeliveryStrategy,
    pub succeeded: bool,
    pub message_handle: Option<MessageHandle>,
    pub error_detail: Option<String>,
    pub attempts: usize,
}

impl DeliveryOutcome {
    fn delivered(strategy: DeliveryStrategy, handle: MessageHandle, attempts: usize) -> Self {
        Self {
            strategy,
            succeeded: true,
            message_handle: Some(handle),
            error_detail: None,
            attempts,
        }
    }

    fn failed(strategy: DeliveryStrategy, detail: String, attempts: usize) -> Self {
        Self {
            strategy,
            succeeded: false,
            message_handle: None,
            error_detail: Some(detail),
            attempts,
        }
    }
}

#[derive(Debug)]
enum AttemptVerdict {
    Succeeded(MessageHandle),
    SoftFailure(MessagingError),
    HardFailure(MessagingError),
}

fn classify_attempt(
    attempt: &DeliveryAttempt,
    result: Result<MessageHandle, MessagingError>,
    has_next: bool,
) -> AttemptVerdict {
    match result {
        Ok(handle) => AttemptVerdict::Succeeded(handle),
        Err(error) if has_next && attempt.fallback_on.allows(&error) => {
            AttemptVerdict::SoftFailure(error)
        }
        Err(error) => AttemptVerdict::HardFailure(error),
    }
}

/// Runs per-strategy fallback chains for normalized posts.
pub struct MediaDeliveryEngine {
    messaging: Arc<dyn MessagingClient>,
    admin: Arc<dyn AdminNotifier>,
    caption_limit: usize,
}

impl MediaDeliveryEngine {
    pub fn new(
        messaging: Arc<dyn MessagingClient>,
        admin: Arc<dyn AdminNotifier>,
        caption_limit: usize,
    ) -> Self {
        Self {
            messaging,
            admin,
            caption_limit,
        }
    }

    pub async fn deliver(&self, post: &NormalizedPost, target: &ChatTarget) -> DeliveryOutcome {
        let strategy = select_delivery_strategy(post.kind());
        tracing::info!(
            post_id = post.display_id(),
            strategy = strategy.as_str(),
            "delivering post"
        );
        match strategy.plan(post, self.caption_limit) {
            Ok(plan) => self.execute_plan(post, target, plan).await,
            Err(error) => {
                let detail = error.to_string();
                self.escalate(post, &detail).await;
                DeliveryOutcome::failed(strategy, detail, 0)
            }
        }
    }

    pub async fn execute_plan(
        &self,
        post: &NormalizedPost,
        target: &ChatTarget,
        plan: DeliveryPlan,
    ) -> DeliveryOutcome {
        let strategy = plan.strategy;
        let attempt_count = plan.attempts.len();
        let mut deferred_attempted = false;
        let mut attempts_made = 0usize;
        let mut final_error: Option<MessagingError> = None;

        for (index, attempt) in plan.attempts.iter().enumerate() {
            attempts_made = index + 1;
            deferred_attempted |= attempt.carries_deferred;
            tracing::debug!(
                post_id = post.display_id(),
                strategy = strategy.as_str(),
                attempt = attempts_made,
                action = attempt.action.as_str(),
                "delivery attempt"
            );
            let result = self.perform(target, &attempt.action).await;
            match classify_attempt(attempt, result, index + 1 < attempt_count) {
                AttemptVerdict::Succeeded(handle) => {
                    if !attempt.carries_deferred {
                        if let Some(deferred) = plan.deferred_message.as_deref() {
                            self.send_deferred_reply(post, &handle, deferred).await;
                        }
                    }
                    tracing::info!(
                        post_id = post.display_id(),
                        strategy = strategy.as_str(),
                        attempt = attempts_made,
                        message_id = handle.message_id,
                        "post delivered"
                    );
                    return DeliveryOutcome::delivered(strategy, handle, attempts_made);
                }
                AttemptVerdict::SoftFailure(error) => {
                    tracing::warn!(
                        post_id = post.display_id(),
                        strategy = strategy.as_str(),
                        attempt = attempts_made,
                        reason = error.kind.as_str(),
                        detail = %error.detail,
                        "delivery attempt failed, trying fallback"
                    );
                }
                AttemptVerdict::HardFailure(error) => {
                    final_error = Some(error);
                    break;
                }
            }
        }

        let detail = final_error
            .map(|error| error.detail)
            .unwrap_or_else(|| "delivery plan contained no attempts".to_string());
        tracing::error!(
            post_id = post.display_id(),
            strategy = strategy.as_str(),
            attempts = attempts_made,
            detail = %detail,
            "delivery chain exhausted"
        );
        self.escalate(post, &detail).await;

        if !deferred_attempted {
            if let Some(rescue) = plan.deferred_rescue_text.as_deref() {
                self.send_deferred_rescue(post, target, rescue).await;
            }
        }
        DeliveryOutcome::failed(strategy, detail, attempts_made)
    }

    async fn perform(
        &self,
        target: &ChatTarget,
        action: &DeliveryAction,
    ) -> Result<MessageHandle, MessagingError> {
        match action {
            DeliveryAction::Text { text, formatting } => {
                self.messaging.send_text(target, text, *formatting).await
            }
            DeliveryAction::Photo { url, caption } => {
                self.messaging.send_photo(target, url, caption).await
            }
            DeliveryAction::Video { url, caption } => {
                self.messaging
                    .send_video(target, url, caption.as_deref())
                    .await
            }
        }
    }

    async fn send_deferred_reply(&self, post: &NormalizedPost, handle: &MessageHandle, text: &str) {
        if let Err(error) = self.messaging.reply_quoted(handle, text).await {
            tracing::warn!(
                post_id = post.display_id(),
                reason = error.kind.as_str(),
                detail = %error.detail,
                "deferred caption reply failed"
            );
            notify_admin_best_effort(
                self.admin.as_ref(),
                &format!(
                    "Could not send the caption of post {} as a reply.\n{}",
                    post.display_id(),
                    error.detail
                ),
            )
            .await;
        }
    }

    async fn send_deferred_rescue(&self, post: &NormalizedPost, target: &ChatTarget, text: &str) {
        match self
            .messaging
            .send_text(target, text, TextFormatting::Markdown)
            .await
        {
            Ok(handle) => tracing::info!(
                post_id = post.display_id(),
                message_id = handle.message_id,
                "deferred caption delivered after media failure"
            ),
            Err(error) => tracing::warn!(
                post_id = post.display_id(),
                reason = error.kind.as_str(),
                detail = %error.detail,
                "deferred caption rescue failed"
            ),
        }
    }

    async fn escalate(&self, post: &NormalizedPost, detail: &str) {
        notify_admin_best_effort(
            self.admin.as_ref(),
            &format!(
                "Could not send the {} post {}.\n{}",
                post.kind().as_str(),
                post.display_id(),
                detail
            ),
        )
        .await;
    }
}
