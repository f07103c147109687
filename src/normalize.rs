//! Canonical comparison keys for article URLs and titles.
//!
//! Both functions are pure and idempotent; their output is used as the key in
//! the sent history and in the same-batch seen sets, so every caller must go
//! through here instead of comparing raw strings.

use url::Url;

/// Query parameter prefixes that only carry campaign or click tracking.
const TRACKING_PREFIXES: &[&str] = &["utm_", "gclid", "fbclid"];

/// Characters dropped from titles before comparison.
const TITLE_PUNCTUATION: &[char] = &[
    '[', ']', '(', ')', '{', '}', '“', '”', '"', '\'', '‘', '’',
];

/// A candidate's `(url, title)` comparison key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    pub url: String,
    pub title: String,
}

impl NormalizedKey {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: normalize_url(url),
            title: normalize_title(title),
        }
    }
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    TRACKING_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Canonicalize a URL for deduplication.
///
/// Scheme and host are lowercased, the fragment is removed, a trailing path
/// slash is stripped, and tracking parameters (`utm_*`, `gclid*`, `fbclid*`)
/// are dropped. Remaining parameters are re-encoded in their original order.
///
/// Never fails: input that does not parse as an absolute URL comes back
/// trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     normalize_url("HTTPS://News.Example.com/a/?utm_source=x&id=3#top"),
///     "https://news.example.com/a?id=3"
/// );
/// ```
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        parsed.set_path(if stripped.is_empty() { "/" } else { stripped });
    }

    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    parsed.to_string()
}

/// Canonicalize a headline for same-batch duplicate detection.
///
/// Brackets and quote marks are removed, runs of whitespace collapse to one
/// space, and the result is trimmed and lowercased. Empty input yields an
/// empty string.
pub fn normalize_title(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !TITLE_PUNCTUATION.contains(c)).collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
