//! Post normalization and multi-strategy delivery pipeline.
//!
//! A raw content-graph post is parsed into a [`NormalizedPost`], mapped to one
//! of six delivery strategies, and delivered through that strategy's fallback
//! chain. Unrecoverable failures are reported to an administrator channel.
//!
//! ```rust
//! use fbtg_core::{parse_post_payload, select_delivery_strategy, DeliveryStrategy, PostKind};
//! use serde_json::json;
//!
//! let post = parse_post_payload(&json!({
//!     "id": "1_2",
//!     "type": "link",
//!     "message": "See this",
//!     "caption": "Example",
//!     "link": "http://x.test"
//! }))
//! .expect("link post");
//! assert_eq!(post.kind(), PostKind::Link);
//! assert_eq!(select_delivery_strategy(post.kind()), DeliveryStrategy::Link);
//! ```

pub mod caption_split;
pub mod collaborators;
pub mod delivery_engine;
pub mod delivery_strategy;
pub mod post_model;
pub mod post_publisher;

#[cfg(test)]
mod testing;

pub use caption_split::*;
pub use collaborators::*;
pub use delivery_engine::*;
pub use delivery_strategy::*;
pub use post_model::*;
pub use post_publisher::*;
