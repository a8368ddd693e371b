use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

mod clients;

mod config;
use config::OrghookConfig;

mod dispatch;
use dispatch::Dispatcher;

mod webhooks;
use webhooks::GitHubSecret;

#[derive(Parser)]
#[clap(version = "0.1")]
struct Opts {
    /// Configuration file for orghook
    #[clap(short, long, parse(from_os_str))]
    config: PathBuf,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();
    let config = OrghookConfig::load(&opts.config)?;

    let secret = config.github.webhook_secret.clone();
    if secret.is_none() {
        warn!("no webhook secret configured, incoming deliveries won't be authenticated");
    }

    let dispatcher = Dispatcher::from_config(config).context("failed to set up orghook")?;

    let rocket = webhooks::build(dispatcher, GitHubSecret(secret));
    rocket
        .launch()
        .await
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(())
}
