mod bootstrap;
mod cli_args;
mod webhook_server;

use anyhow::{Context, Result};
use clap::Parser;

use crate::bootstrap::{build_publisher, init_tracing};
use crate::cli_args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let publisher = build_publisher(&cli.relay)?;

    match cli.command {
        Command::Publish { post_id } => {
            let report = publisher.publish(&post_id).await?;
            let rendered =
                serde_json::to_string_pretty(&report).context("failed to render publish report")?;
            println!("{rendered}");
        }
        Command::Serve { bind } => {
            webhook_server::run_webhook_server(bind, publisher).await?;
        }
    }
    Ok(())
}
