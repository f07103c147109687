//! Command-line interface definitions.
//!
//! Every credential and path can come from a flag or from the environment,
//! which is how the scheduler and the webhook host pass them in.

use crate::clients::DEFAULT_TIMEOUT;
use crate::clients::news::BASE_QUERY;
use crate::ranking::DEFAULT_TOP_K;
use crate::state::{DEFAULT_RETENTION_DAYS, PREFERENCES_PATH, SENT_HISTORY_PATH};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the automotive news bot.
///
/// # Examples
///
/// ```sh
/// # Scheduled run: pick and send today's articles
/// auto_news_bot daily --top-k 4
///
/// # Webhook host: handle one Telegram update from a file
/// auto_news_bot webhook --body update.json
///
/// # Inspect what the bot has learned
/// auto_news_bot stats
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Chat that receives the daily articles (group ids are negative)
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
    pub chat_id: Option<String>,

    /// News search API key
    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// GitHub token for the state repository (falls back to GH_TOKEN)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Repository holding the state documents, as owner/name
    #[arg(long, env = "GITHUB_REPO")]
    pub github_repo: Option<String>,

    /// Per-request timeout for every outbound call, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Optional YAML file replacing the built-in keyword vocabulary
    #[arg(long, env = "VOCABULARY_PATH")]
    pub vocabulary: Option<PathBuf>,

    /// Path of the preference profile in the state repository
    #[arg(long, env = "PREFERENCES_PATH", default_value = PREFERENCES_PATH)]
    pub preferences_path: String,

    /// Path of the sent-article history in the state repository
    #[arg(long, env = "SENT_HISTORY_PATH", default_value = SENT_HISTORY_PATH)]
    pub history_path: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, rank and send today's articles
    Daily(DailyArgs),

    /// Handle one Telegram update and print the response body
    Webhook {
        /// File containing the update JSON; stdin when omitted
        #[arg(long)]
        body: Option<PathBuf>,
    },

    /// Print the learned preference profile as JSON
    Stats {
        /// Number of keywords to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Args, Debug)]
pub struct DailyArgs {
    /// Number of articles to send
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Number of articles requested from the news API
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,

    #[arg(long, default_value = "ko")]
    pub language: String,

    /// Only request articles published within this many hours
    #[arg(long, default_value_t = 36)]
    pub recency_hours: i64,

    /// Days a sent URL is remembered
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: i64,

    /// Liked keywords added to the search query
    #[arg(long, default_value_t = 6)]
    pub query_keywords: usize,

    /// Search expression that is always included
    #[arg(long, default_value = BASE_QUERY)]
    pub base_query: String,
}
