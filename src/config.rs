//! Resolves CLI and environment values into per-entry-point settings.
//!
//! Each entry point needs a different set of credentials. A missing or blank
//! one is a [`BotError::ConfigurationMissing`] naming the variable, raised
//! before any collaborator is built.

use crate::cli::{DailyArgs, GlobalArgs};
use crate::error::BotError;
use crate::pipeline::DailySettings;
use chrono::Duration;
use std::time::Duration as StdDuration;

/// Location of and access to the state repository.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub repo: String,
    pub token: String,
}

/// Everything the daily run needs to build its collaborators.
#[derive(Debug, Clone)]
pub struct DailyConfig {
    pub telegram_token: String,
    pub news_api_key: String,
    pub store: StoreConfig,
    pub timeout: StdDuration,
    pub settings: DailySettings,
}

/// Everything the webhook handler needs.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub telegram_token: String,
    pub store: StoreConfig,
    pub timeout: StdDuration,
    pub preferences_path: String,
}

fn require(value: Option<&str>, name: &'static str) -> Result<String, BotError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BotError::ConfigurationMissing(name)),
    }
}

/// `GITHUB_TOKEN` wins; `GH_TOKEN` is the fallback.
fn github_token(explicit: Option<&str>, fallback: Option<&str>) -> Result<String, BotError> {
    require(explicit, "GITHUB_TOKEN").or_else(|_| require(fallback, "GITHUB_TOKEN"))
}

/// Per-request timeout, never zero.
pub fn timeout(args: &GlobalArgs) -> StdDuration {
    StdDuration::from_secs(args.timeout_secs.max(1))
}

pub fn store_config(args: &GlobalArgs) -> Result<StoreConfig, BotError> {
    let fallback = std::env::var("GH_TOKEN").ok();
    Ok(StoreConfig {
        repo: require(args.github_repo.as_deref(), "GITHUB_REPO")?,
        token: github_token(args.github_token.as_deref(), fallback.as_deref())?,
    })
}

pub fn daily_config(args: &GlobalArgs, daily: &DailyArgs) -> Result<DailyConfig, BotError> {
    let telegram_token = require(args.telegram_token.as_deref(), "TELEGRAM_BOT_TOKEN")?;
    let chat_id = require(args.chat_id.as_deref(), "TELEGRAM_CHAT_ID")?;
    let news_api_key = require(args.news_api_key.as_deref(), "NEWS_API_KEY")?;
    let store = store_config(args)?;

    Ok(DailyConfig {
        telegram_token,
        news_api_key,
        store,
        timeout: timeout(args),
        settings: DailySettings {
            chat_id,
            top_k: daily.top_k,
            page_size: daily.page_size,
            language: daily.language.clone(),
            recency: Duration::hours(daily.recency_hours),
            retention: Duration::days(daily.retention_days),
            base_query: daily.base_query.clone(),
            query_keywords: daily.query_keywords,
            preferences_path: args.preferences_path.clone(),
            history_path: args.history_path.clone(),
        },
    })
}

pub fn webhook_config(args: &GlobalArgs) -> Result<WebhookConfig, BotError> {
    Ok(WebhookConfig {
        telegram_token: require(args.telegram_token.as_deref(), "TELEGRAM_BOT_TOKEN")?,
        store: store_config(args)?,
        timeout: timeout(args),
        preferences_path: args.preferences_path.clone(),
    })
}
