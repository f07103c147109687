//! Utility functions for timestamp handling and log-friendly string shortening.
//!
//! Persisted documents were written by several generations of the bot, so
//! timestamps show up as RFC 3339 with `Z`, naive ISO 8601 without a zone,
//! or a bare `YYYY-MM-DD` date. [`parse_timestamp`] accepts all of them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Parse a stored timestamp leniently, assuming UTC when no zone is present.
///
/// Accepts, in order:
/// - RFC 3339 (`2025-08-25T09:00:00.123Z`, `2025-08-25T18:00:00+09:00`)
/// - naive ISO 8601 (`2025-08-25T09:00:00.123456`)
/// - a bare date (`2025-08-25`, read as midnight UTC)
///
/// # Returns
///
/// `None` for empty or unrecognized input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.trim_end_matches('Z');
    if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Format a timestamp the way sent-history entries are stored (`...T..:..:..ffffffZ`).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters with an ellipsis and a count
/// of the dropped bytes appended. Cuts always land on a character boundary,
/// which matters for Hangul titles.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// First `max` characters of `s`, with `...` appended when something was cut.
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}...", &s[..cut]),
    }
}
