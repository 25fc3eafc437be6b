//! Strategy selection and fallback-chain planning per post kind.
//!
//! A strategy turns a [`NormalizedPost`] into a [`DeliveryPlan`]: the ordered
//! list of attempts the engine runs, plus the deferred caption handling for
//! media-bearing kinds. Plans are plain data; nothing here performs I/O.

use serde::Serialize;
use thiserror::Error;

use crate::caption_split::{split_caption, CaptionSplit};
use crate::collaborators::{MessagingError, TextFormatting};
use crate::post_model::{NormalizedPost, PostKind};

const VIDEO_HOST_YOUTUBE: &str = "youtube.com";
const VIDEO_HOST_FACEBOOK: &str = "facebook.com";
const FILE_LINK_LABEL: &str = "Download file";
const MEDIA_LINK_LABEL: &str = "media";
const DIRECT_LINK_LABEL: &str = "link direct";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `DeliveryStrategy` values.
pub enum DeliveryStrategy {
    Photo,
    Video,
    Shared,
    Status,
    Link,
    FileUpload,
}

/// Maps a post kind to its rendering strategy.
pub fn select_delivery_strategy(kind: PostKind) -> DeliveryStrategy {
    match kind {
        PostKind::Photo => DeliveryStrategy::Photo,
        PostKind::Video => DeliveryStrategy::Video,
        PostKind::Shared => DeliveryStrategy::Shared,
        PostKind::Status => DeliveryStrategy::Status,
        PostKind::Link => DeliveryStrategy::Link,
        PostKind::FileUpload => DeliveryStrategy::FileUpload,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One outbound call against the messaging platform.
pub enum DeliveryAction {
    Text {
        text: String,
        formatting: TextFormatting,
    },
    Photo {
        url: String,
        caption: String,
    },
    Video {
        url: String,
        caption: Option<String>,
    },
}

impl DeliveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which failures of an attempt move the chain on to the next attempt.
pub enum FallbackTrigger {
    Never,
    ClientRejection,
    AnyFailure,
}

impl FallbackTrigger {
    pub fn allows(self, error: &MessagingError) -> bool {
        match self {
            Self::Never => false,
            Self::ClientRejection => error.is_client_rejection(),
            Self::AnyFailure => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single step of a fallback chain.
pub struct DeliveryAttempt {
    pub action: DeliveryAction,
    pub fallback_on: FallbackTrigger,
    /// The action text already carries the deferred message.
    pub carries_deferred: bool,
}

impl DeliveryAttempt {
    fn new(action: DeliveryAction, fallback_on: FallbackTrigger) -> Self {
        Self {
            action,
            fallback_on,
            carries_deferred: false,
        }
    }

    fn carrying_deferred(mut self, carries_deferred: bool) -> Self {
        self.carries_deferred = carries_deferred;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Ordered attempts plus deferred-caption handling for one post.
pub struct DeliveryPlan {
    pub strategy: DeliveryStrategy,
    pub attempts: Vec<DeliveryAttempt>,
    /// Sent as a quoted reply once an attempt that does not carry it succeeds.
    pub deferred_message: Option<String>,
    /// Best-effort text sent after a hard failure when the deferred message
    /// was never attempted.
    pub deferred_rescue_text: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Enumerates supported `DeliveryPlanError` values.
pub enum DeliveryPlanError {
    #[error("{} post has no media source", .0.as_str())]
    MissingMediaSource(PostKind),
    #[error("shared post has neither permalink nor link")]
    MissingSharedTarget,
}

impl DeliveryStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Shared => "shared",
            Self::Status => "status",
            Self::Link => "link",
            Self::FileUpload => "file_upload",
        }
    }

    pub fn plan(
        self,
        post: &NormalizedPost,
        caption_limit: usize,
    ) -> Result<DeliveryPlan, DeliveryPlanError> {
        match self {
            Self::Photo => {
                let source = required_media_source(post)?;
                let split = split_caption(post.message(), caption_limit);
                let merged = merged_fallback_text(&split, source);
                Ok(DeliveryPlan {
                    strategy: self,
                    attempts: vec![
                        DeliveryAttempt::new(
                            DeliveryAction::Photo {
                                url: source.to_string(),
                                caption: split.inline_caption.clone(),
                            },
                            FallbackTrigger::ClientRejection,
                        ),
                        DeliveryAttempt::new(
                            DeliveryAction::Text {
                                text: merged,
                                formatting: TextFormatting::Markdown,
                            },
                            FallbackTrigger::Never,
                        )
                        .carrying_deferred(split.is_deferred()),
                    ],
                    deferred_rescue_text: rescue_text(&split, source),
                    deferred_message: split.deferred_message,
                })
            }
            Self::Video => {
                let source = required_media_source(post)?;
                let split = split_caption(post.message(), caption_limit);
                let mut attempts = vec![DeliveryAttempt::new(
                    DeliveryAction::Video {
                        url: source.to_string(),
                        caption: Some(split.inline_caption.clone())
                            .filter(|caption| !caption.is_empty()),
                    },
                    FallbackTrigger::AnyFailure,
                )];
                if let Some(watch_url) = video_watch_url(source) {
                    attempts.push(DeliveryAttempt::new(
                        DeliveryAction::Text {
                            text: format!("{}\n{}", split.inline_caption, watch_url),
                            formatting: TextFormatting::Plain,
                        },
                        FallbackTrigger::Never,
                    ));
                }
                Ok(DeliveryPlan {
                    strategy: self,
                    attempts,
                    deferred_rescue_text: rescue_text(&split, source),
                    deferred_message: split.deferred_message,
                })
            }
            Self::FileUpload => {
                let source = required_media_source(post)?;
                let split = split_caption(post.message(), caption_limit);
                Ok(DeliveryPlan {
                    strategy: self,
                    attempts: vec![DeliveryAttempt::new(
                        DeliveryAction::Text {
                            text: format!(
                                "{}\n[{}]({})",
                                escape_markdown(&split.inline_caption),
                                FILE_LINK_LABEL,
                                source
                            ),
                            formatting: TextFormatting::Markdown,
                        },
                        FallbackTrigger::Never,
                    )],
                    deferred_rescue_text: rescue_text(&split, source),
                    deferred_message: split.deferred_message,
                })
            }
            Self::Shared => {
                let target = post
                    .permalink()
                    .or_else(|| post.media_source())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .ok_or(DeliveryPlanError::MissingSharedTarget)?;
                Ok(single_text_plan(self, target.to_string(), TextFormatting::Plain))
            }
            Self::Status => Ok(single_text_plan(
                self,
                post.message().to_string(),
                TextFormatting::Plain,
            )),
            Self::Link => {
                let source = required_media_source(post)?;
                let label = post
                    .caption()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .unwrap_or(source);
                Ok(single_text_plan(
                    self,
                    format!(
                        "{}\n[{}]({})",
                        escape_markdown(post.message()),
                        escape_markdown(label),
                        source
                    ),
                    TextFormatting::Markdown,
                ))
            }
        }
    }
}

fn single_text_plan(
    strategy: DeliveryStrategy,
    text: String,
    formatting: TextFormatting,
) -> DeliveryPlan {
    DeliveryPlan {
        strategy,
        attempts: vec![DeliveryAttempt::new(
            DeliveryAction::Text { text, formatting },
            FallbackTrigger::Never,
        )],
        deferred_message: None,
        deferred_rescue_text: None,
    }
}

fn required_media_source(post: &NormalizedPost) -> Result<&str, DeliveryPlanError> {
    post.media_source()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(DeliveryPlanError::MissingMediaSource(post.kind()))
}

fn merged_fallback_text(split: &CaptionSplit, source: &str) -> String {
    match split.deferred_message.as_deref() {
        Some(deferred) => format!(
            "{}\n[{DIRECT_LINK_LABEL}]({source})",
            escape_markdown(deferred)
        ),
        None => format!(
            "{}\n[{MEDIA_LINK_LABEL}]({source})",
            escape_markdown(&split.inline_caption)
        ),
    }
}

fn rescue_text(split: &CaptionSplit, source: &str) -> Option<String> {
    split
        .deferred_message
        .as_deref()
        .map(|deferred| {
            format!(
                "{}\n[{DIRECT_LINK_LABEL}]({source})",
                escape_markdown(deferred)
            )
        })
}

/// Escapes the characters Telegram's legacy Markdown treats as entity
/// delimiters so free text cannot unbalance a message.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Canonical watch URL for a recognised video host, if any.
pub fn video_watch_url(source: &str) -> Option<String> {
    if source.contains(VIDEO_HOST_YOUTUBE) {
        return youtube_video_id(source).map(|id| format!("{VIDEO_HOST_YOUTUBE}/watch?v={id}"));
    }
    if source.contains(VIDEO_HOST_FACEBOOK) {
        return facebook_video_id(source).map(|id| format!("{VIDEO_HOST_FACEBOOK}/watch/?v={id}"));
    }
    None
}

fn split_path_and_query(source: &str) -> (&str, Option<&str>) {
    match source.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (source, None),
    }
}

fn query_video_id(query: Option<&str>) -> Option<&str> {
    query.and_then(|query| {
        query
            .split(['&', '?'])
            .find_map(|pair| pair.strip_prefix("v="))
            .filter(|id| !id.is_empty())
    })
}

fn youtube_video_id(source: &str) -> Option<&str> {
    let (path, query) = split_path_and_query(source);
    query_video_id(query).or_else(|| {
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
    })
}

fn facebook_video_id(source: &str) -> Option<&str> {
    let (path, query) = split_path_and_query(source);
    query_video_id(query)
        .or_else(|| path.rsplit('/').nth(1).filter(|segment| !segment.is_empty()))
}
