//! Data models for candidate articles and the two persisted documents.
//!
//! This module defines:
//! - [`Article`]: a candidate as returned by the news search API
//! - [`PreferenceProfile`]: the learned keyword weights (`user_preferences.json`)
//! - [`SentHistory`]: normalized URLs already delivered (`sent_articles.json`)
//!
//! Both documents have been written by earlier versions of the bot with
//! slightly different shapes, so decoding is lenient: unknown timestamp
//! formats become `None`, malformed weights become `1`, and zero or negative
//! weights are dropped on load.

use crate::utils::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A news article candidate.
///
/// Every field is optional because the search API returns `null` for
/// removed or partially indexed articles; the dedup filter rejects
/// candidates without a title or URL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl Article {
    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn description_str(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// The single, shared keyword-preference profile.
///
/// Invariant: every weight in `keyword_weights` is strictly positive. Keys
/// are removed when their weight reaches zero, never stored as `0`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PreferenceProfile {
    #[serde(
        rename = "liked_keywords",
        default,
        deserialize_with = "lenient_weights"
    )]
    pub keyword_weights: BTreeMap<String, u32>,

    #[serde(default, deserialize_with = "lenient_count")]
    pub total_likes: u64,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        serialize_with = "timestamp_or_empty"
    )]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(
        default,
        deserialize_with = "lenient_date",
        serialize_with = "date_or_empty"
    )]
    pub last_cleanup: Option<NaiveDate>,
}

impl PreferenceProfile {
    /// Empty profile whose cleanup window starts at `now`.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            keyword_weights: BTreeMap::new(),
            total_likes: 0,
            last_updated: Some(now),
            last_cleanup: Some(now.date_naive()),
        }
    }
}

/// Normalized URL -> send timestamp, as stored in `sent_articles.json`.
///
/// Timestamps are kept as the raw stored strings so that entries whose
/// timestamp cannot be parsed survive a load/save cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SentHistory {
    entries: BTreeMap<String, String>,
}

impl SentHistory {
    pub fn contains(&self, normalized_url: &str) -> bool {
        self.entries.contains_key(normalized_url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a delivered article under its normalized URL.
    pub fn record(&mut self, normalized_url: impl Into<String>, sent_at: DateTime<Utc>) {
        self.entries
            .insert(normalized_url.into(), format_timestamp(sent_at));
    }

    /// Drop entries older than `retention`; unparseable timestamps are kept.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let cutoff = now - retention;
        let before = self.entries.len();
        self.entries
            .retain(|_, ts| parse_timestamp(ts).is_none_or(|sent| sent > cutoff));
        before - self.entries.len()
    }
}

impl FromIterator<(String, String)> for SentHistory {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Interpret one stored weight: integers and numeric strings as-is (floored),
/// anything else as `1`. Returns `None` for weights that are not positive.
fn coerce_weight(value: &Value) -> Option<u32> {
    let weight = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u.min(u32::MAX as u64) as u32
            } else if let Some(i) = n.as_i64() {
                if i <= 0 { 0 } else { i.min(u32::MAX as i64) as u32 }
            } else {
                let f = n.as_f64().unwrap_or(1.0);
                if f <= 0.0 { 0 } else { f.floor().min(u32::MAX as f64) as u32 }
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) if i <= 0 => 0,
            Ok(i) => i.min(u32::MAX as i64) as u32,
            Err(_) => 1,
        },
        _ => 1,
    };
    (weight > 0).then_some(weight)
}

fn lenient_weights<'de, D>(deserializer: D) -> Result<BTreeMap<String, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter(|(k, _)| !k.trim().is_empty())
        .filter_map(|(k, v)| coerce_weight(&v).map(|w| (k, w)))
        .collect())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_timestamp))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(parse_timestamp)
        .map(|ts| ts.date_naive()))
}

fn timestamp_or_empty<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&format_timestamp(*ts)),
        None => serializer.serialize_str(""),
    }
}

fn date_or_empty<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
        None => serializer.serialize_str(""),
    }
}
