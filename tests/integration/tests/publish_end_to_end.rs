use std::sync::Arc;

use fbtg_core::{
    AdminChannel, ChatTarget, DeliveryStrategy, MessagingClient, PostKind, PostPublisher,
    PublishError, PublishStatus, PublisherConfig,
};
use fbtg_graph::{GraphApiClient, GraphClientConfig};
use fbtg_telegram::{TelegramBotClient, TelegramClientConfig};
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

const CHANNEL: &str = "-100";
const ADMIN: &str = "-900";

fn publisher_for(graph: &MockServer, telegram: &MockServer) -> PostPublisher {
    let graph_client = GraphApiClient::new(GraphClientConfig {
        api_base: graph.base_url(),
        access_token: "graph-token".to_string(),
        ..GraphClientConfig::default()
    })
    .expect("graph client");
    let messaging: Arc<dyn MessagingClient> = Arc::new(
        TelegramBotClient::new(TelegramClientConfig {
            api_base: telegram.base_url(),
            bot_token: "test-token".to_string(),
            ..TelegramClientConfig::default()
        })
        .expect("telegram client"),
    );
    let admin = AdminChannel::new(messaging.clone(), ChatTarget::new(ADMIN));
    PostPublisher::new(
        Arc::new(graph_client),
        messaging,
        Arc::new(admin),
        PublisherConfig::new(ChatTarget::new(CHANNEL)),
    )
}

fn telegram_ok(message_id: i64) -> serde_json::Value {
    json!({"ok": true, "result": {"message_id": message_id}})
}

#[tokio::test]
async fn integration_long_photo_caption_is_deferred_to_quoted_reply() {
    let graph = MockServer::start();
    let telegram = MockServer::start();
    let long_message = "m".repeat(250);

    graph.mock(|when, then| {
        when.method(GET).path("/v3.1/10_20");
        then.status(200).json_body(json!({
            "id": "10_20",
            "type": "photo",
            "message": long_message,
            "permalink_url": "https://facebook.com/10_20",
            "attachments": {"data": [{
                "type": "photo",
                "media": {"image": {"src": "https://cdn.test/p.jpg"}}
            }]}
        }));
    });
    let admin_summary = telegram.mock(|when, then| {
        when.method(POST)
            .path("/bottest-token/sendMessage")
            .json_body_includes(json!({"chat_id": ADMIN}).to_string());
        then.status(200).json_body(telegram_ok(1));
    });
    let photo = telegram.mock(|when, then| {
        when.method(POST).path("/bottest-token/sendPhoto").json_body_includes(
            json!({"chat_id": CHANNEL, "photo": "https://cdn.test/p.jpg"}).to_string(),
        );
        then.status(200).json_body(telegram_ok(10));
    });
    let reply = telegram.mock(|when, then| {
        when.method(POST).path("/bottest-token/sendMessage").json_body_includes(
            json!({
                "chat_id": CHANNEL,
                "text": long_message,
                "reply_parameters": {"message_id": 10}
            })
            .to_string(),
        );
        then.status(200).json_body(telegram_ok(11));
    });
    let button = telegram.mock(|when, then| {
        when.method(POST)
            .path("/bottest-token/editMessageReplyMarkup")
            .json_body_includes(
                json!({
                    "chat_id": CHANNEL,
                    "message_id": 10,
                    "reply_markup": {"inline_keyboard": [[{
                        "text": "View original post",
                        "url": "https://facebook.com/10_20"
                    }]]}
                })
                .to_string(),
            );
        then.status(200).json_body(telegram_ok(10));
    });

    let report = publisher_for(&graph, &telegram)
        .publish("10_20")
        .await
        .expect("publish");

    admin_summary.assert_calls(1);
    photo.assert_calls(1);
    reply.assert_calls(1);
    button.assert_calls(1);
    assert_eq!(report.kind, PostKind::Photo);
    assert_eq!(report.status, PublishStatus::Delivered);
    assert_eq!(report.delivery.strategy, DeliveryStrategy::Photo);
    assert_eq!(report.delivery.attempts, 1);
    assert!(report.action_control_attached);
}

#[tokio::test]
async fn integration_rejected_photo_falls_back_to_markdown_link() {
    let graph = MockServer::start();
    let telegram = MockServer::start();

    graph.mock(|when, then| {
        when.method(GET).path("/v3.1/30_40");
        then.status(200).json_body(json!({
            "id": "30_40",
            "type": "photo",
            "message": "Sunset",
            "attachments": {"data": [{
                "media": {"image": {"src": "https://cdn.test/big.webp"}}
            }]}
        }));
    });
    telegram.mock(|when, then| {
        when.method(POST)
            .path("/bottest-token/sendMessage")
            .json_body_includes(json!({"chat_id": ADMIN}).to_string());
        then.status(200).json_body(telegram_ok(1));
    });
    let photo = telegram.mock(|when, then| {
        when.method(POST).path("/bottest-token/sendPhoto");
        then.status(400).json_body(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: failed to get HTTP URL content"
        }));
    });
    let fallback = telegram.mock(|when, then| {
        when.method(POST).path("/bottest-token/sendMessage").json_body_includes(
            json!({
                "chat_id": CHANNEL,
                "text": "Sunset\n[media](https://cdn.test/big.webp)",
                "parse_mode": "Markdown"
            })
            .to_string(),
        );
        then.status(200).json_body(telegram_ok(21));
    });

    let report = publisher_for(&graph, &telegram)
        .publish("30_40")
        .await
        .expect("publish");

    photo.assert_calls(1);
    fallback.assert_calls(1);
    assert_eq!(report.status, PublishStatus::Delivered);
    assert_eq!(report.delivery.attempts, 2);
    assert_eq!(
        report.delivery.message_handle.map(|handle| handle.message_id),
        Some(21)
    );
    assert!(!report.action_control_attached);
}

#[tokio::test]
async fn regression_graph_failure_is_reported_to_admin_chat() {
    let graph = MockServer::start();
    let telegram = MockServer::start();

    graph.mock(|when, then| {
        when.method(GET).path("/v3.1/404_1");
        then.status(400).json_body(json!({
            "error": {"message": "Unsupported get request.", "code": 100}
        }));
    });
    let admin_notice = telegram.mock(|when, then| {
        when.method(POST).path("/bottest-token/sendMessage").json_body_includes(
            json!({
                "chat_id": ADMIN,
                "text": "Could not fetch post 404_1:\nUnsupported get request."
            })
            .to_string(),
        );
        then.status(200).json_body(telegram_ok(2));
    });

    let error = publisher_for(&graph, &telegram)
        .publish("404_1")
        .await
        .expect_err("fetch failure");

    admin_notice.assert_calls(1);
    assert!(matches!(error, PublishError::FetchFailed { .. }));
}

#[tokio::test]
async fn regression_channel_outage_escalates_to_admin() {
    let graph = MockServer::start();
    let telegram = MockServer::start();

    graph.mock(|when, then| {
        when.method(GET).path("/v3.1/50_60");
        then.status(200).json_body(json!({
            "id": "50_60",
            "type": "status",
            "message": "Plain update"
        }));
    });
    telegram.mock(|when, then| {
        when.method(POST)
            .path("/bottest-token/sendMessage")
            .json_body_includes(json!({"chat_id": CHANNEL}).to_string());
        then.status(503).body("service unavailable");
    });
    let admin = telegram.mock(|when, then| {
        when.method(POST)
            .path("/bottest-token/sendMessage")
            .json_body_includes(json!({"chat_id": ADMIN}).to_string());
        then.status(200).json_body(telegram_ok(3));
    });

    let report = publisher_for(&graph, &telegram)
        .publish("50_60")
        .await
        .expect("publish returns a report");

    // Fetch summary plus the escalation notice.
    admin.assert_calls(2);
    assert_eq!(report.status, PublishStatus::DeliveryFailed);
    assert_eq!(
        report.delivery.error_detail.as_deref(),
        Some("service unavailable")
    );
    assert!(report.delivery.message_handle.is_none());
}
