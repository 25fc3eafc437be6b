use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "fbtg",
    about = "Relay content-graph posts into a Telegram channel",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub relay: RelayArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one post by id, deliver it, and print the JSON report.
    Publish {
        #[arg(value_name = "POST_ID")]
        post_id: String,
    },
    /// Accept post notifications on an HTTP webhook.
    Serve {
        #[arg(
            long,
            env = "FBTG_BIND",
            default_value = "127.0.0.1:8080",
            help = "Socket address for the webhook listener"
        )]
        bind: SocketAddr,
    },
}

#[derive(Debug, Clone, Args)]
/// Connection and delivery options shared by every subcommand.
pub struct RelayArgs {
    #[arg(
        long = "telegram-bot-token",
        env = "FBTG_TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        help = "Telegram bot token used for every Bot API call"
    )]
    pub telegram_bot_token: String,

    #[arg(
        long = "graph-access-token",
        env = "FBTG_GRAPH_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Access token for the content graph"
    )]
    pub graph_access_token: String,

    #[arg(
        long = "admin-chat-id",
        env = "FBTG_ADMIN_CHAT_ID",
        allow_hyphen_values = true,
        help = "Chat that receives fetch summaries and failure notices"
    )]
    pub admin_chat_id: String,

    #[arg(
        long = "channel-chat-id",
        env = "FBTG_CHANNEL_CHAT_ID",
        help = "Destination channel for relayed posts (defaults to the admin chat)"
    )]
    pub channel_chat_id: Option<String>,

    #[arg(
        long = "telegram-api-base",
        env = "FBTG_TELEGRAM_API_BASE",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_base: String,

    #[arg(
        long = "graph-api-base",
        env = "FBTG_GRAPH_API_BASE",
        default_value = "https://graph.facebook.com"
    )]
    pub graph_api_base: String,

    #[arg(
        long = "graph-api-version",
        env = "FBTG_GRAPH_API_VERSION",
        default_value = "v3.1"
    )]
    pub graph_api_version: String,

    #[arg(
        long = "http-timeout-ms",
        env = "FBTG_HTTP_TIMEOUT_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for graph and Telegram calls"
    )]
    pub http_timeout_ms: u64,

    #[arg(
        long = "caption-limit",
        env = "FBTG_CAPTION_LIMIT",
        default_value_t = fbtg_core::DEFAULT_CAPTION_LIMIT,
        value_parser = parse_positive_usize,
        help = "Maximum characters attached inline to a photo"
    )]
    pub caption_limit: usize,

    #[arg(
        long = "action-label",
        env = "FBTG_ACTION_LABEL",
        default_value = fbtg_core::DEFAULT_ACTION_LABEL,
        help = "Label of the button linking back to the original post"
    )]
    pub action_label: String,

    #[arg(
        long = "disable-web-page-preview",
        env = "FBTG_DISABLE_WEB_PAGE_PREVIEW",
        help = "Suppress link previews on relayed text messages"
    )]
    pub disable_web_page_preview: bool,
}

impl RelayArgs {
    pub fn channel_chat_id(&self) -> &str {
        self.channel_chat_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.admin_chat_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{parse_positive_u64, Cli, Command};

    const REQUIRED: [&str; 7] = [
        "fbtg",
        "--telegram-bot-token",
        "tg-token",
        "--graph-access-token",
        "graph-token",
        "--admin-chat-id",
        "-100",
    ];

    #[test]
    fn unit_publish_defaults_are_applied() {
        let mut argv = REQUIRED.to_vec();
        argv.extend(["publish", "1_2"]);
        let cli = Cli::try_parse_from(argv).expect("parse");

        assert_eq!(cli.relay.caption_limit, 200);
        assert_eq!(cli.relay.http_timeout_ms, 5_000);
        assert_eq!(cli.relay.graph_api_version, "v3.1");
        assert_eq!(cli.relay.action_label, "View original post");
        assert_eq!(cli.relay.channel_chat_id(), "-100");
        assert!(!cli.relay.disable_web_page_preview);
        match cli.command {
            Command::Publish { post_id } => assert_eq!(post_id, "1_2"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unit_channel_chat_id_overrides_admin_chat() {
        let mut argv = REQUIRED.to_vec();
        argv.extend([
            "--channel-chat-id",
            "@relay",
            "--disable-web-page-preview",
            "serve",
            "--bind",
            "0.0.0.0:9000",
        ]);
        let cli = Cli::try_parse_from(argv).expect("parse");

        assert_eq!(cli.relay.channel_chat_id(), "@relay");
        assert!(cli.relay.disable_web_page_preview);
        match cli.command {
            Command::Serve { bind } => assert_eq!(bind.port(), 9000),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn regression_zero_caption_limit_is_rejected() {
        let mut argv = REQUIRED.to_vec();
        argv.extend(["--caption-limit", "0", "publish", "1"]);
        assert!(Cli::try_parse_from(argv).is_err());
        assert!(parse_positive_u64("0").is_err());
        assert_eq!(parse_positive_u64("15"), Ok(15));
    }
}
