//! Telegram Bot API implementation of the relay's messaging contract.
//!
//! Each capability maps to one Bot API method. Provider responses are
//! classified into `MessagingErrorKind` values so the delivery engine can tell
//! a rejected payload (worth a fallback) from an outage (escalate).

use std::time::Duration;

use async_trait::async_trait;
use fbtg_core::{
    ChatTarget, MessageHandle, MessagingClient, MessagingError, MessagingErrorKind,
    TextFormatting,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

const DETAIL_LIMIT_CHARS: usize = 512;

#[derive(Debug, Clone)]
/// Public struct `TelegramClientConfig` used by the relay entry points.
pub struct TelegramClientConfig {
    pub api_base: String,
    pub bot_token: String,
    pub http_timeout_ms: u64,
    pub disable_web_page_preview: bool,
}

impl Default for TelegramClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            http_timeout_ms: 5_000,
            disable_web_page_preview: false,
        }
    }
}

#[derive(Debug, Error)]
/// Enumerates supported `TelegramSetupError` values.
pub enum TelegramSetupError {
    #[error("telegram bot token must not be empty")]
    MissingBotToken,
    #[error("telegram http timeout must be greater than 0")]
    InvalidTimeout,
    #[error("failed to build telegram http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TelegramEnvelope {
    #[serde(default)]
    ok: bool,
    result: Option<Value>,
    description: Option<String>,
}

#[derive(Debug, Clone)]
/// Bot API client bound to one bot token.
pub struct TelegramBotClient {
    client: reqwest::Client,
    config: TelegramClientConfig,
}

impl TelegramBotClient {
    pub fn new(config: TelegramClientConfig) -> Result<Self, TelegramSetupError> {
        if config.bot_token.trim().is_empty() {
            return Err(TelegramSetupError::MissingBotToken);
        }
        if config.http_timeout_ms == 0 {
            return Err(TelegramSetupError::InvalidTimeout);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token.trim(),
            method
        )
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, MessagingError> {
        tracing::debug!(method, "telegram request");
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|error| classify_transport_error(method, error))?;
        let status = response.status();
        let body_raw = response.text().await.unwrap_or_default();
        let envelope = serde_json::from_str::<TelegramEnvelope>(&body_raw).ok();

        if !status.is_success() {
            let detail = envelope
                .and_then(|envelope| envelope.description)
                .unwrap_or_else(|| truncate_detail(&body_raw));
            return Err(
                MessagingError::new(classify_provider_status(status), detail)
                    .with_http_status(status.as_u16()),
            );
        }

        match envelope {
            Some(TelegramEnvelope {
                ok: true,
                result: Some(result),
                ..
            }) => Ok(result),
            Some(envelope) => Err(MessagingError::new(
                MessagingErrorKind::InvalidResponse,
                envelope.description.unwrap_or_else(|| {
                    format!("telegram {method} response was not ok")
                }),
            )
            .with_http_status(status.as_u16())),
            None => Err(MessagingError::new(
                MessagingErrorKind::InvalidResponse,
                format!(
                    "telegram {method} returned non-json body: {}",
                    truncate_detail(&body_raw)
                ),
            )
            .with_http_status(status.as_u16())),
        }
    }

    async fn send_message_method(
        &self,
        method: &str,
        chat_id: &str,
        body: Value,
    ) -> Result<MessageHandle, MessagingError> {
        let result = self.call(method, body).await?;
        let message_id = extract_message_id(&result).ok_or_else(|| {
            MessagingError::new(
                MessagingErrorKind::InvalidResponse,
                format!("telegram {method} response did not include a message id"),
            )
        })?;
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id,
        })
    }

    fn text_body(&self, chat_id: &str, text: &str, formatting: TextFormatting) -> Value {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": self.config.disable_web_page_preview,
        });
        if let Some(parse_mode) = parse_mode(formatting) {
            body["parse_mode"] = Value::String(parse_mode.to_string());
        }
        body
    }
}

#[async_trait]
impl MessagingClient for TelegramBotClient {
    async fn send_text(
        &self,
        target: &ChatTarget,
        text: &str,
        formatting: TextFormatting,
    ) -> Result<MessageHandle, MessagingError> {
        let body = self.text_body(target.as_str(), text, formatting);
        self.send_message_method("sendMessage", target.as_str(), body)
            .await
    }

    async fn send_photo(
        &self,
        target: &ChatTarget,
        url: &str,
        caption: &str,
    ) -> Result<MessageHandle, MessagingError> {
        let mut body = json!({
            "chat_id": target.as_str(),
            "photo": url,
        });
        if !caption.is_empty() {
            body["caption"] = Value::String(caption.to_string());
        }
        self.send_message_method("sendPhoto", target.as_str(), body)
            .await
    }

    async fn send_video(
        &self,
        target: &ChatTarget,
        url: &str,
        caption: Option<&str>,
    ) -> Result<MessageHandle, MessagingError> {
        let mut body = json!({
            "chat_id": target.as_str(),
            "video": url,
        });
        if let Some(caption) = caption.filter(|caption| !caption.is_empty()) {
            body["caption"] = Value::String(caption.to_string());
        }
        self.send_message_method("sendVideo", target.as_str(), body)
            .await
    }

    async fn attach_action_control(
        &self,
        handle: &MessageHandle,
        label: &str,
        url: &str,
    ) -> Result<(), MessagingError> {
        let body = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
            "reply_markup": {
                "inline_keyboard": [[{"text": label, "url": url}]]
            }
        });
        self.call("editMessageReplyMarkup", body).await.map(|_| ())
    }

    async fn reply_quoted(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<MessageHandle, MessagingError> {
        let mut body = self.text_body(&handle.chat_id, text, TextFormatting::Plain);
        body["reply_parameters"] = json!({"message_id": handle.message_id});
        self.send_message_method("sendMessage", &handle.chat_id, body)
            .await
    }
}

fn parse_mode(formatting: TextFormatting) -> Option<&'static str> {
    match formatting {
        TextFormatting::Plain => None,
        TextFormatting::Markdown => Some("Markdown"),
    }
}

fn classify_provider_status(status: StatusCode) -> MessagingErrorKind {
    match status {
        StatusCode::REQUEST_TIMEOUT => MessagingErrorKind::Timeout,
        StatusCode::TOO_MANY_REQUESTS => MessagingErrorKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MessagingErrorKind::Unauthorized,
        status if status.is_server_error() => MessagingErrorKind::Unavailable,
        status if status.is_client_error() => MessagingErrorKind::Rejected,
        _ => MessagingErrorKind::InvalidResponse,
    }
}

fn classify_transport_error(method: &str, error: reqwest::Error) -> MessagingError {
    let kind = if error.is_timeout() {
        MessagingErrorKind::Timeout
    } else {
        MessagingErrorKind::Transport
    };
    // The request url embeds the bot token.
    let error = error.without_url();
    MessagingError::new(kind, format!("telegram {method} request failed: {error}"))
}

fn extract_message_id(result: &Value) -> Option<i64> {
    result.get("message_id").and_then(Value::as_i64)
}

fn truncate_detail(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= DETAIL_LIMIT_CHARS {
        return trimmed.to_string();
    }
    let mut output: String = trimmed.chars().take(DETAIL_LIMIT_CHARS).collect();
    output.push_str("...");
    output
}
