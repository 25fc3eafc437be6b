//! HTTP front door: one webhook route that publishes a post per request.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fbtg_core::{PostPublisher, PublishError};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

struct WebhookServerState {
    publisher: PostPublisher,
    // Posts for the same channel are delivered one at a time.
    publish_lock: Mutex<()>,
}

#[derive(Debug, Deserialize)]
struct PostNotification {
    post_id: String,
}

pub(crate) async fn run_webhook_server(bind: SocketAddr, publisher: PostPublisher) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    tracing::info!(addr = %local_addr, "webhook server listening");

    let app = build_webhook_router(publisher);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("webhook server exited unexpectedly")?;
    tracing::info!("webhook server stopped");
    Ok(())
}

fn build_webhook_router(publisher: PostPublisher) -> Router {
    let state = Arc::new(WebhookServerState {
        publisher,
        publish_lock: Mutex::new(()),
    });
    Router::new()
        .route("/webhooks/post", post(handle_post_webhook))
        .route("/healthz", get(handle_webhook_health))
        .with_state(state)
}

async fn handle_webhook_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn handle_post_webhook(
    State(state): State<Arc<WebhookServerState>>,
    body: String,
) -> Response {
    let notification = match serde_json::from_str::<PostNotification>(&body) {
        Ok(notification) => notification,
        Err(error) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                format!("expected a JSON object with post_id: {error}"),
            )
            .into_response();
        }
    };

    let result = {
        let _guard = state.publish_lock.lock().await;
        state.publisher.publish(&notification.post_id).await
    };
    match result {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => {
            let (status, code) = publish_error_status(&error);
            tracing::warn!(post_id = notification.post_id.trim(), %error, "webhook publish rejected");
            error_response(status, code, error.to_string()).into_response()
        }
    }
}

fn publish_error_status(error: &PublishError) -> (StatusCode, &'static str) {
    match error {
        PublishError::EmptyPostId => (StatusCode::BAD_REQUEST, "empty_post_id"),
        PublishError::InvalidPostId { .. } => (StatusCode::BAD_REQUEST, "invalid_post_id"),
        PublishError::FetchFailed { .. } => (StatusCode::BAD_GATEWAY, "fetch_failed"),
        PublishError::MalformedPost { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "malformed_post"),
    }
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: String,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(json!({"error":{"code":code,"message":message}})),
    )
}
