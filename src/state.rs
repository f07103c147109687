//! Loading and saving the two persisted documents.
//!
//! Read policy: a missing or undecodable document degrades to the empty
//! default. A document the store could not return at all also yields the
//! default so the run can continue, but it is marked
//! [`LoadSource::Unavailable`] and can never be written back.
//!
//! Write policy: every save presents the version token from the read its
//! value was built on. If the document changed in between, the store answers
//! [`BotError::VersionConflict`]; the conflict is returned to the caller and
//! not retried, so the later of two overlapping updates is lost.

use crate::clients::{DocumentStore, VersionToken};
use crate::error::BotError;
use crate::models::{PreferenceProfile, SentHistory};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

/// Default location of the preference profile document.
pub const PREFERENCES_PATH: &str = "user_preferences.json";
/// Default location of the sent-history document.
pub const SENT_HISTORY_PATH: &str = "sent_articles.json";
/// Sent-history entries older than this are dropped on load.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Where a loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    Missing,
    Malformed,
    Unavailable,
}

/// What a read saw, needed to write the document back safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBase {
    pub source: LoadSource,
    /// Token of the document as read; `None` when it did not exist or its
    /// version is unknown.
    pub version: Option<VersionToken>,
}

impl ReadBase {
    /// `false` when the current document was never seen.
    pub fn is_writable(&self) -> bool {
        self.source != LoadSource::Unavailable
    }
}

async fn load_document<S, T>(store: &S, path: &str) -> (Option<T>, ReadBase)
where
    S: DocumentStore,
    T: DeserializeOwned,
{
    let base = |source, version| ReadBase { source, version };
    match store.get(path).await {
        Ok(Some(doc)) => match serde_json::from_str::<T>(&doc.body) {
            Ok(value) => (Some(value), base(LoadSource::Stored, Some(doc.version))),
            Err(e) => {
                warn!(%path, error = %e, "Stored document is malformed; using default");
                (None, base(LoadSource::Malformed, Some(doc.version)))
            }
        },
        Ok(None) => (None, base(LoadSource::Missing, None)),
        Err(e @ BotError::MalformedDocument { .. }) => {
            warn!(%path, error = %e, "Stored document is malformed; using default");
            (None, base(LoadSource::Malformed, None))
        }
        Err(e) => {
            warn!(%path, error = %e, transient = e.is_transient(), "Document store read failed; using default, writes disabled");
            (None, base(LoadSource::Unavailable, None))
        }
    }
}

/// Write `value` as pretty JSON on top of the version recorded in `base`.
async fn save_document<S, T>(
    store: &S,
    path: &str,
    value: &T,
    base: &ReadBase,
    now: DateTime<Utc>,
) -> Result<(), BotError>
where
    S: DocumentStore,
    T: Serialize,
{
    if !base.is_writable() {
        warn!(%path, "Skipping write; document was not readable");
        return Err(BotError::UnreadBase {
            path: path.to_string(),
        });
    }

    let body = serde_json::to_string_pretty(value)?;
    let message = format!("update {} {}", path, now.format("%Y-%m-%dT%H:%M:%SZ"));
    store.put(path, &body, base.version.as_ref(), &message).await?;
    info!(%path, bytes = body.len(), "Saved document");
    Ok(())
}

/// Load the preference profile, falling back to an empty one.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_profile<S: DocumentStore>(
    store: &S,
    path: &str,
    now: DateTime<Utc>,
) -> (PreferenceProfile, ReadBase) {
    let (profile, base) = load_document::<S, PreferenceProfile>(store, path).await;
    let profile = profile.unwrap_or_else(|| PreferenceProfile::fresh(now));
    info!(
        source = ?base.source,
        keywords = profile.keyword_weights.len(),
        total_likes = profile.total_likes,
        "Loaded preference profile"
    );
    (profile, base)
}

#[instrument(level = "info", skip_all, fields(%path))]
pub async fn save_profile<S: DocumentStore>(
    store: &S,
    path: &str,
    profile: &PreferenceProfile,
    base: &ReadBase,
    now: DateTime<Utc>,
) -> Result<(), BotError> {
    save_document(store, path, profile, base, now).await
}

/// Load the sent history and drop entries older than `retention`.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_history<S: DocumentStore>(
    store: &S,
    path: &str,
    now: DateTime<Utc>,
    retention: Duration,
) -> (SentHistory, ReadBase) {
    let (history, base) = load_document::<S, SentHistory>(store, path).await;
    let mut history = history.unwrap_or_default();
    let pruned = history.prune(now, retention);
    info!(source = ?base.source, entries = history.len(), pruned, "Loaded sent history");
    (history, base)
}

#[instrument(level = "info", skip_all, fields(%path))]
pub async fn save_history<S: DocumentStore>(
    store: &S,
    path: &str,
    history: &SentHistory,
    base: &ReadBase,
    now: DateTime<Utc>,
) -> Result<(), BotError> {
    save_document(store, path, history, base, now).await
}
