//! External collaborators and their HTTP adapters.
//!
//! The pipeline only talks to the outside world through three traits:
//!
//! | Trait | Adapter | Service |
//! |-------|---------|---------|
//! | [`NewsSource`] | [`news::NewsApiClient`] | news search API (`/v2/everything`) |
//! | [`Messenger`] | [`telegram::TelegramClient`] | Telegram Bot API |
//! | [`DocumentStore`] | [`github::GithubStore`] | GitHub contents API (versioned JSON files) |
//!
//! Every adapter builds its `reqwest::Client` with a bounded timeout, so no
//! call can hang; a timeout surfaces as [`BotError::Timeout`], which
//! [`BotError::is_transient`] reports as retryable. [`retry::RetryingSource`]
//! adds exponential backoff in front of any [`NewsSource`].

pub mod github;
pub mod news;
pub mod retry;
pub mod telegram;

use crate::error::BotError;
use crate::models::Article;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default per-request timeout for every collaborator.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// A news search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Boolean keyword expression, e.g. `자동차 OR 현대차`.
    pub expression: String,
    pub language: String,
    /// Only articles published after this instant.
    pub from: DateTime<Utc>,
    pub page_size: u32,
}

/// Source of candidate articles.
pub trait NewsSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Article>, BotError>;
}

/// An inline button attached to an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineButton {
    pub text: String,
    /// Opaque payload echoed back in the callback event.
    pub payload: String,
}

/// Outbound messaging.
pub trait Messenger {
    /// Post `text` to `chat_id`, with an optional row of inline buttons.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<(), BotError>;

    /// Clear the pending state of a pressed button.
    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), BotError>;
}

/// Optimistic-concurrency token returned on read and supplied on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(pub String);

/// A stored document body with its current version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub body: String,
    pub version: VersionToken,
}

/// Versioned document storage.
pub trait DocumentStore {
    /// Fetch `path`; `Ok(None)` when it does not exist.
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>, BotError>;

    /// Create or replace `path`.
    ///
    /// `version` must be the token of the current document when one exists;
    /// a missing or stale token yields [`BotError::VersionConflict`].
    async fn put(
        &self,
        path: &str,
        body: &str,
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<(), BotError>;
}
