//! # Auto News Bot
//!
//! A Telegram bot that sends a small daily pick of Korean automotive news and
//! learns which topics the reader cares about from 👍/👎 buttons.
//!
//! ## Features
//!
//! - Searches a NewsAPI-compatible service with a query personalized by the
//!   reader's liked keywords
//! - Drops articles already sent in the last week, and syndicated copies
//!   whose URLs differ only in tracking parameters
//! - Ranks the rest by learned keyword weights and sends the top picks with
//!   like/dislike buttons
//! - Turns button presses into keyword weight updates, reset every 30 days
//! - Keeps all state as two JSON documents in a GitHub repository
//!
//! ## Usage
//!
//! ```sh
//! auto_news_bot daily
//! auto_news_bot webhook --body update.json
//! auto_news_bot stats --top 10
//! ```
//!
//! ## Architecture
//!
//! Each invocation is one run-to-completion process; nothing is shared in
//! memory between runs:
//! 1. **daily**: fetch, deduplicate, rank, send, record sent URLs
//! 2. **webhook**: classify one Telegram update, update the profile, acknowledge
//! 3. **stats**: print a summary of the learned profile

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod clients;
mod config;
mod dedup;
mod error;
mod feedback;
mod models;
mod normalize;
mod pipeline;
mod preferences;
mod ranking;
mod state;
#[cfg(test)]
mod testing;
mod utils;
mod vocabulary;
mod webhook;

use cli::{Cli, Command, DailyArgs, GlobalArgs};
use clients::github::GithubStore;
use clients::news::NewsApiClient;
use clients::retry::RetryingSource;
use clients::telegram::TelegramClient;
use feedback::{FeedbackSettings, handle_feedback};
use vocabulary::Vocabulary;
use webhook::{InboundUpdate, WebhookResponse, parse_update};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(command = ?args.command, "Parsed CLI arguments");

    let vocabulary = match &args.global.vocabulary {
        Some(path) => Vocabulary::load(path).await?,
        None => Vocabulary::builtin().clone(),
    };

    let result = match &args.command {
        Command::Daily(daily) => run_daily(&args.global, daily, &vocabulary).await,
        Command::Webhook { body } => run_webhook(&args.global, body.as_ref(), &vocabulary).await,
        Command::Stats { top } => run_stats(&args.global, *top).await,
    };

    let elapsed = start_time.elapsed();
    match &result {
        Ok(()) => info!(elapsed_ms = elapsed.as_millis() as u64, "Finished"),
        Err(e) => error!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "Failed"),
    }
    result
}

#[instrument(level = "info", skip_all)]
async fn run_daily(
    global: &GlobalArgs,
    daily: &DailyArgs,
    vocabulary: &Vocabulary,
) -> Result<(), Box<dyn Error>> {
    let config = config::daily_config(global, daily)?;

    let news = RetryingSource::new(
        NewsApiClient::new(config.news_api_key, config.timeout)?,
        3,
        StdDuration::from_secs(1),
    );
    let messenger = TelegramClient::new(&config.telegram_token, config.timeout)?;
    let store = GithubStore::new(config.store.repo, config.store.token, config.timeout)?;

    let report = pipeline::run_daily(
        &news,
        &messenger,
        &store,
        vocabulary,
        &config.settings,
        Utc::now(),
    )
    .await?;
    info!(
        fetched = report.fetched,
        kept = report.dedup.kept,
        sent = report.sent,
        failed = report.failed,
        history_saved = report.history_saved,
        "Daily run summary"
    );
    Ok(())
}

async fn read_body(path: Option<&PathBuf>) -> std::io::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path).await,
        None => {
            let mut body = String::new();
            tokio::io::stdin().read_to_string(&mut body).await?;
            Ok(body)
        }
    }
}

#[instrument(level = "info", skip_all)]
async fn run_webhook(
    global: &GlobalArgs,
    body_path: Option<&PathBuf>,
    vocabulary: &Vocabulary,
) -> Result<(), Box<dyn Error>> {
    let config = config::webhook_config(global)?;
    let body = read_body(body_path).await?;

    let response = match parse_update(&body) {
        InboundUpdate::Ignored(note) => {
            info!(note, "Ignoring update");
            WebhookResponse::ignored(note)
        }
        InboundUpdate::Feedback(event) => {
            let messenger = TelegramClient::new(&config.telegram_token, config.timeout)?;
            let store = GithubStore::new(config.store.repo, config.store.token, config.timeout)?;
            let settings = FeedbackSettings {
                preferences_path: &config.preferences_path,
                vocabulary,
            };
            let outcome = handle_feedback(&event, &store, &messenger, &settings, Utc::now()).await;
            WebhookResponse::from(&outcome)
        }
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_stats(global: &GlobalArgs, top: usize) -> Result<(), Box<dyn Error>> {
    let store_config = config::store_config(global)?;
    let store = GithubStore::new(store_config.repo, store_config.token, config::timeout(global))?;

    let (profile, base) = state::load_profile(&store, &global.preferences_path, Utc::now()).await;
    debug!(source = ?base.source, "Profile loaded for stats");
    let stats = preferences::profile_stats(&profile, top);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
