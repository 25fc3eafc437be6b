//! Caption-length decisions for media-bearing messages.

use serde::Serialize;

/// Longest body sent inline as a media caption.
pub const DEFAULT_CAPTION_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Result of [`split_caption`].
pub struct CaptionSplit {
    pub inline_caption: String,
    pub deferred_message: Option<String>,
}

impl CaptionSplit {
    pub fn is_deferred(&self) -> bool {
        self.deferred_message.is_some()
    }
}

/// Keeps `body` inline when it fits in `limit` characters, otherwise defers
/// the whole body to a follow-up message and leaves the caption empty.
pub fn split_caption(body: &str, limit: usize) -> CaptionSplit {
    if body.chars().count() <= limit {
        return CaptionSplit {
            inline_caption: body.to_string(),
            deferred_message: None,
        };
    }
    CaptionSplit {
        inline_caption: String::new(),
        deferred_message: Some(body.to_string()),
    }
}
