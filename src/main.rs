#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

mod bot;
mod cli;
mod commands;
mod config;
mod discord;
mod errors;
mod instagram;
mod parsers;
mod state;
mod tracking;
mod utils;

#[cfg(test)]
mod test_support;

use bot::Bot;
use cli::Cli;
use config::Config;
use discord::DiscordClient;
use instagram::GraphApiClient;
use state::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;
    if let Some(state) = cli.state {
        config.bot.state_path = state;
    }

    utils::logging::init_tracing(&config.logging);
    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!("failed to read .env file: {err}");
        }
    }
    info!("{} starting up", config.bot.display_name);

    let token = config
        .auth
        .bot_token()
        .context("no discord bot token configured")?;
    let discord_client = Arc::new(DiscordClient::new(token));
    let source = Arc::new(GraphApiClient::new(&config.instagram)?);
    if config.instagram.access_token().is_none() {
        warn!("no instagram access token configured, tracking will stop on its first poll");
    }

    let store = StateStore::new(config.bot.state_path.clone());
    let bot = Arc::new(Bot::new(&config, store, discord_client.clone(), source)?);
    discord_client.set_bot(bot.clone());

    discord_client.start().await?;

    tokio::select! {
        result = discord_client.wait() => {
            if let Err(err) = result {
                error!("discord gateway error: {err:#}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            discord_client.stop().await?;
        }
    }

    info!("{} shutting down", bot.display_name());
    Ok(())
}
