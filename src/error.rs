//! Error taxonomy shared by every collaborator call.
//!
//! Each outbound call (news search, messaging, document store) returns a
//! [`BotError`]. Callers decide per call site whether an error is fatal,
//! degrades to a default, or is logged and skipped; [`BotError::is_transient`]
//! tells them whether the failure was a network-level one worth retrying.

use crate::utils::truncate_for_log;
use thiserror::Error;

/// Errors surfaced by the bot's I/O boundaries.
#[derive(Debug, Error)]
pub enum BotError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the configured timeout.
    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    /// The remote answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// A stored document or API payload could not be decoded.
    #[error("malformed document {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    /// The document changed since its version token was read.
    #[error("version conflict writing {path}")]
    VersionConflict { path: String },

    /// The document could not be read, so a write would overwrite state
    /// that was never seen.
    #[error("not writing {path}: its current version could not be read")]
    UnreadBase { path: String },

    /// A required credential or identifier is absent.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(&'static str),

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BotError {
    /// Map a `reqwest` failure, separating timeouts from other transport errors.
    pub fn from_reqwest(service: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            BotError::Timeout { service }
        } else {
            BotError::Transport { service, source }
        }
    }

    /// Build a [`BotError::Status`] with the response body shortened for logs.
    pub fn status(service: &'static str, status: u16, body: &str) -> Self {
        BotError::Status {
            service,
            status,
            body: truncate_for_log(body, 300),
        }
    }

    /// Network-level failures that a later attempt may not hit again.
    pub fn is_transient(&self) -> bool {
        match self {
            BotError::Transport { .. } | BotError::Timeout { .. } => true,
            BotError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BotError::Timeout { service: "news" }.is_transient());
        assert!(BotError::status("news", 503, "unavailable").is_transient());
        assert!(BotError::status("news", 429, "slow down").is_transient());
        assert!(!BotError::status("news", 401, "bad key").is_transient());
        assert!(!BotError::ConfigurationMissing("NEWS_API_KEY").is_transient());
        assert!(
            !BotError::UnreadBase {
                path: "sent_articles.json".into()
            }
            .is_transient()
        );
        assert!(
            !BotError::VersionConflict {
                path: "user_preferences.json".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_status_body_is_truncated() {
        let long = "x".repeat(1000);
        match BotError::status("github", 500, &long) {
            BotError::Status { body, .. } => assert!(body.contains("…(+700 bytes)")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_configuration_missing_names_variable() {
        let e = BotError::ConfigurationMissing("TELEGRAM_CHAT_ID");
        assert_eq!(e.to_string(), "missing configuration: TELEGRAM_CHAT_ID");
    }
}
