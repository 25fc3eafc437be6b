use std::sync::Arc;

use anyhow::{Context, Result};
use fbtg_core::{AdminChannel, ChatTarget, MessagingClient, PostPublisher, PublisherConfig};
use fbtg_graph::{GraphApiClient, GraphClientConfig};
use fbtg_telegram::{TelegramBotClient, TelegramClientConfig};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::cli_args::RelayArgs;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn build_publisher(args: &RelayArgs) -> Result<PostPublisher> {
    let graph = GraphApiClient::new(GraphClientConfig {
        api_base: args.graph_api_base.clone(),
        api_version: args.graph_api_version.clone(),
        access_token: args.graph_access_token.clone(),
        http_timeout_ms: args.http_timeout_ms,
    })
    .context("failed to configure content graph client")?;

    let telegram = TelegramBotClient::new(TelegramClientConfig {
        api_base: args.telegram_api_base.clone(),
        bot_token: args.telegram_bot_token.clone(),
        http_timeout_ms: args.http_timeout_ms,
        disable_web_page_preview: args.disable_web_page_preview,
    })
    .context("failed to configure telegram client")?;
    let messaging: Arc<dyn MessagingClient> = Arc::new(telegram);

    let admin = AdminChannel::new(messaging.clone(), ChatTarget::new(args.admin_chat_id.as_str()));
    let mut config = PublisherConfig::new(ChatTarget::new(args.channel_chat_id()));
    config.caption_limit = args.caption_limit;
    config.action_label = args.action_label.clone();

    tracing::info!(
        channel = %config.channel,
        admin = %admin.target(),
        caption_limit = config.caption_limit,
        "relay configured"
    );
    Ok(PostPublisher::new(
        Arc::new(graph),
        messaging,
        Arc::new(admin),
        config,
    ))
}
