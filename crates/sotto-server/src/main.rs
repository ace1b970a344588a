use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::info;

use sotto_bot::reaper::Reaper;
use sotto_bot::{Bot, dispatch};
use sotto_db::Database;
use sotto_telegram::api::TelegramApi;
use sotto_telegram::poller;
use sotto_types::config::{BotConfig, normalize_channels};

/// Long-poll timeout for getUpdates.
const POLL_TIMEOUT_SECS: u64 = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sotto=debug".into()),
        )
        .init();

    // Config — missing required settings are fatal here and nowhere else
    let bot_token =
        std::env::var("SOTTO_BOT_TOKEN").context("SOTTO_BOT_TOKEN is not set")?;
    let admin_id: i64 = std::env::var("SOTTO_ADMIN_ID")
        .context("SOTTO_ADMIN_ID is not set")?
        .parse()
        .context("SOTTO_ADMIN_ID must be a numeric user id")?;
    let db_path = std::env::var("SOTTO_DB_PATH").unwrap_or_else(|_| "sotto.db".into());
    let channels = normalize_channels(&std::env::var("SOTTO_CHANNELS").unwrap_or_default());
    let support_url = std::env::var("SOTTO_SUPPORT_URL")
        .ok()
        .filter(|s| !s.is_empty());

    if channels.is_empty() {
        info!("no mandatory channels configured; the membership gate always passes");
    }

    // Init database
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    let api = Arc::new(TelegramApi::new(&bot_token));
    let me = api
        .get_me()
        .await
        .context("getMe failed — check the bot token")?;
    let bot_username = me
        .username
        .context("the bot account has no username")?;
    info!("authorized as @{bot_username}");

    let config = Arc::new(BotConfig {
        admin_id,
        channels,
        support_url,
        bot_username,
    });

    let reaper = Reaper::spawn(api.clone());
    let bot = Bot {
        api: api.clone(),
        db,
        config,
        reaper,
    };

    // One task per inbound update; ordering across updates is not assumed
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(poller::poll_loop(api, POLL_TIMEOUT_SECS, update_tx, cancel_rx));

    info!("sotto is running");

    while let Some(update) = update_rx.recv().await {
        tokio::spawn(dispatch::handle_update(bot.clone(), update));
    }

    Ok(())
}
