//! Content-graph client that fetches a single post by id.

use std::time::Duration;

use async_trait::async_trait;
use fbtg_core::{ContentGraphClient, GraphError};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Field projection requested for every post.
pub const POST_FIELDS: &str =
    "id,type,message,permalink_url,caption,link,attachments{type,url,media,description,title,subattachments}";
const DETAIL_LIMIT_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct GraphClientConfig {
    pub api_base: String,
    pub api_version: String,
    pub access_token: String,
    pub http_timeout_ms: u64,
}

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://graph.facebook.com".to_string(),
            api_version: "v3.1".to_string(),
            access_token: String::new(),
            http_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Error)]
/// Enumerates supported `GraphSetupError` values.
pub enum GraphSetupError {
    #[error("graph access token must not be empty")]
    MissingAccessToken,
    #[error("graph api base {0:?} is not a usable base url")]
    InvalidApiBase(String),
    #[error("graph api version must not be empty")]
    MissingApiVersion,
    #[error("graph http timeout must be greater than 0")]
    InvalidTimeout,
    #[error("failed to build graph http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GraphApiClient {
    client: reqwest::Client,
    api_base: Url,
    config: GraphClientConfig,
}

impl GraphApiClient {
    pub fn new(config: GraphClientConfig) -> Result<Self, GraphSetupError> {
        if config.access_token.trim().is_empty() {
            return Err(GraphSetupError::MissingAccessToken);
        }
        if config.api_version.trim().is_empty() {
            return Err(GraphSetupError::MissingApiVersion);
        }
        if config.http_timeout_ms == 0 {
            return Err(GraphSetupError::InvalidTimeout);
        }
        let api_base = Url::parse(config.api_base.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GraphSetupError::InvalidApiBase(config.api_base.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            api_base,
            config,
        })
    }

    /// The post id is pushed as a single percent-encoded path segment.
    fn post_url(&self, post_id: &str) -> Url {
        let mut url = self.api_base.clone();
        url.set_query(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(self.config.api_version.trim().trim_matches('/'))
                .push(post_id);
        }
        url
    }
}

#[async_trait]
impl ContentGraphClient for GraphApiClient {
    async fn fetch_post(&self, post_id: &str) -> Result<Value, GraphError> {
        tracing::debug!(post_id, "fetching post from content graph");
        let response = self
            .client
            .get(self.post_url(post_id))
            .query(&[
                ("fields", POST_FIELDS),
                ("access_token", self.config.access_token.trim()),
            ])
            .send()
            .await
            .map_err(|error| {
                // The query string carries the access token.
                GraphError::new(format!("graph request failed: {}", error.without_url()))
            })?;
        let status = response.status();
        let body_raw = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = serde_json::from_str::<GraphErrorEnvelope>(&body_raw)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| truncate_detail(&body_raw));
            return Err(GraphError::new(detail).with_http_status(status.as_u16()));
        }

        serde_json::from_str::<Value>(&body_raw).map_err(|error| {
            GraphError::new(format!("graph response was not valid json: {error}"))
                .with_http_status(status.as_u16())
        })
    }
}

fn truncate_detail(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if trimmed.chars().count() <= DETAIL_LIMIT_CHARS {
        return trimmed.to_string();
    }
    let mut output: String = trimmed.chars().take(DETAIL_LIMIT_CHARS).collect();
    output.push_str("...");
    output
}
