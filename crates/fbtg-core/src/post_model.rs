//! Normalization of raw content-graph post payloads.
//!
//! Graph payloads are loosely typed: every key is optional, and the `type`
//! field only loosely predicts how the post should be rendered. Parsing
//! resolves the payload into exactly one [`PostKind`] and a single primary
//! media source, applying the reclassification rules once at construction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const ATTACHMENT_TYPE_FILE_UPLOAD: &str = "file_upload";
const YOUTUBE_CAPTION: &str = "youtube.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `PostKind` values.
pub enum PostKind {
    Photo,
    Video,
    Shared,
    Status,
    Link,
    FileUpload,
}

impl PostKind {
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
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Reasons a payload cannot become a `NormalizedPost`. Every variant is a
/// malformed post from the publisher's point of view.
pub enum PostModelError {
    #[error("malformed post payload: {0}")]
    InvalidShape(String),
    #[error("unsupported post kind: {}", .raw_type.as_deref().unwrap_or("<missing>"))]
    UnsupportedPostKind { raw_type: Option<String> },
    #[error("malformed {} post: missing {field}", .kind.as_str())]
    MissingField { kind: PostKind, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Typed, attribute-complete view of a single post.
pub struct NormalizedPost {
    id: Option<String>,
    kind: PostKind,
    message: String,
    permalink: Option<String>,
    caption: Option<String>,
    media_source: Option<String>,
}

impl NormalizedPost {
    pub fn builder(kind: PostKind) -> NormalizedPostBuilder {
        NormalizedPostBuilder {
            post: NormalizedPost {
                id: None,
                kind,
                message: String::new(),
                permalink: None,
                caption: None,
                media_source: None,
            },
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> PostKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn permalink(&self) -> Option<&str> {
        self.permalink.as_deref()
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn media_source(&self) -> Option<&str> {
        self.media_source.as_deref()
    }

    /// Label used in logs and administrator notices.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<synthetic>")
    }
}

/// Builder for posts that did not come from a raw payload.
#[derive(Debug, Clone)]
pub struct NormalizedPostBuilder {
    post: NormalizedPost,
}

impl NormalizedPostBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.post.id = Some(id.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.post.message = message.into();
        self
    }

    pub fn permalink(mut self, permalink: impl Into<String>) -> Self {
        self.post.permalink = Some(permalink.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.post.caption = Some(caption.into());
        self
    }

    pub fn media_source(mut self, media_source: impl Into<String>) -> Self {
        self.post.media_source = Some(media_source.into());
        self
    }

    pub fn build(self) -> NormalizedPost {
        self.post
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawPost {
    id: Option<String>,
    #[serde(rename = "type")]
    post_type: Option<String>,
    message: Option<String>,
    permalink_url: Option<String>,
    caption: Option<String>,
    link: Option<String>,
    attachments: Option<RawAttachments>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttachments {
    #[serde(default)]
    data: Vec<RawAttachment>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttachment {
    #[serde(rename = "type")]
    attachment_type: Option<String>,
    url: Option<String>,
    media: Option<RawMedia>,
    source: Option<String>,
    subattachments: Option<RawAttachments>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMedia {
    image: Option<RawImage>,
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImage {
    src: Option<String>,
}

impl RawAttachment {
    fn image_src(&self) -> Option<&str> {
        self.media
            .as_ref()
            .and_then(|media| media.image.as_ref())
            .and_then(|image| non_empty(image.src.as_deref()))
    }

    fn url(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    fn external_source(&self) -> Option<&str> {
        non_empty(self.source.as_deref()).or_else(|| {
            self.media
                .as_ref()
                .and_then(|media| non_empty(media.source.as_deref()))
        })
    }

    fn is_file_upload(&self) -> bool {
        self.attachment_type
            .as_deref()
            .map(str::trim)
            .is_some_and(|value| value.eq_ignore_ascii_case(ATTACHMENT_TYPE_FILE_UPLOAD))
    }
}

impl RawPost {
    fn attachments(&self) -> &[RawAttachment] {
        self.attachments
            .as_ref()
            .map(|attachments| attachments.data.as_slice())
            .unwrap_or_default()
    }

    fn first_attachment(&self) -> Option<&RawAttachment> {
        self.attachments().first()
    }

    fn file_upload_attachment(&self) -> Option<&RawAttachment> {
        self.attachments().iter().find_map(|attachment| {
            if attachment.is_file_upload() {
                return Some(attachment);
            }
            attachment
                .subattachments
                .as_ref()
                .and_then(|nested| nested.data.iter().find(|item| item.is_file_upload()))
        })
    }
}

/// Parses a raw content-graph payload into a [`NormalizedPost`].
pub fn parse_post_payload(raw: &Value) -> Result<NormalizedPost, PostModelError> {
    if !raw.is_object() {
        return Err(PostModelError::InvalidShape(
            "post payload must be a JSON object".to_string(),
        ));
    }
    let post = RawPost::deserialize(raw)
        .map_err(|error| PostModelError::InvalidShape(error.to_string()))?;
    let (kind, media_source) = resolve_kind(&post)?;
    let media_source = media_source.map(str::to_string);
    Ok(NormalizedPost {
        id: non_empty(post.id.as_deref()).map(str::to_string),
        kind,
        message: post.message.unwrap_or_default(),
        permalink: non_empty(post.permalink_url.as_deref()).map(str::to_string),
        caption: post.caption,
        media_source,
    })
}

/// Parses a raw payload supplied as JSON text.
pub fn parse_post_payload_str(raw: &str) -> Result<NormalizedPost, PostModelError> {
    let value = serde_json::from_str::<Value>(raw)
        .map_err(|error| PostModelError::InvalidShape(format!("invalid json: {error}")))?;
    parse_post_payload(&value)
}

fn resolve_kind(post: &RawPost) -> Result<(PostKind, Option<&str>), PostModelError> {
    let raw_type = post
        .post_type
        .as_deref()
        .map(|value| value.trim().to_ascii_lowercase());
    match raw_type.as_deref() {
        Some("photo") => {
            let source = post
                .first_attachment()
                .and_then(RawAttachment::image_src)
                .ok_or(PostModelError::MissingField {
                    kind: PostKind::Photo,
                    field: "attachments.data[0].media.image.src",
                })?;
            Ok((PostKind::Photo, Some(source)))
        }
        Some("video") => {
            let attachment = post.first_attachment().ok_or(PostModelError::MissingField {
                kind: PostKind::Video,
                field: "attachments.data[0]",
            })?;
            let hosted_externally = post.caption.as_deref().map(str::trim) == Some(YOUTUBE_CAPTION);
            let source = if hosted_externally {
                attachment
                    .external_source()
                    .ok_or(PostModelError::MissingField {
                        kind: PostKind::Video,
                        field: "attachments.data[0].source",
                    })?
            } else {
                attachment.url().ok_or(PostModelError::MissingField {
                    kind: PostKind::Video,
                    field: "attachments.data[0].url",
                })?
            };
            Ok((PostKind::Video, Some(source)))
        }
        Some("status") => {
            if let Some(file) = post.file_upload_attachment() {
                let source = file.url().ok_or(PostModelError::MissingField {
                    kind: PostKind::FileUpload,
                    field: "attachments.data[].url",
                })?;
                return Ok((PostKind::FileUpload, Some(source)));
            }
            match post.first_attachment() {
                Some(attachment) => {
                    let source = attachment
                        .image_src()
                        .or_else(|| attachment.url())
                        .ok_or(PostModelError::MissingField {
                            kind: PostKind::Photo,
                            field: "attachments.data[0].media.image.src",
                        })?;
                    Ok((PostKind::Photo, Some(source)))
                }
                None => Ok((PostKind::Status, None)),
            }
        }
        Some("link") => match post.first_attachment() {
            Some(attachment) => {
                let source = attachment.url().ok_or(PostModelError::MissingField {
                    kind: PostKind::Shared,
                    field: "attachments.data[0].url",
                })?;
                Ok((PostKind::Shared, Some(source)))
            }
            None => {
                let source = non_empty(post.link.as_deref()).ok_or(PostModelError::MissingField {
                    kind: PostKind::Link,
                    field: "link",
                })?;
                Ok((PostKind::Link, Some(source)))
            }
        },
        Some("shared") => Ok((
            PostKind::Shared,
            post.first_attachment().and_then(RawAttachment::url),
        )),
        _ => Err(PostModelError::UnsupportedPostKind {
            raw_type: post.post_type.clone(),
        }),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
