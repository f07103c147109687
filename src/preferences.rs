//! Preference model: keyword extraction and the like/dislike update rules.
//!
//! The profile is a plain value. Functions here take a profile, return the
//! updated profile, and never touch the document store; persisting is the
//! caller's job (see [`crate::state`]).
//!
//! # Update rules
//!
//! - like: every extracted keyword gains `+1`, `total_likes` gains `+1`
//! - dislike: every extracted keyword present loses `1`; a key reaching `0`
//!   is removed, so weights never go negative
//! - every [`CLEANUP_INTERVAL_DAYS`] days since `last_cleanup` the whole
//!   profile resets before the event is applied

use crate::models::PreferenceProfile;
use crate::vocabulary::Vocabulary;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Days between full profile resets.
pub const CLEANUP_INTERVAL_DAYS: i64 = 30;

/// Direction of a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn is_like(self) -> bool {
        matches!(self, Reaction::Like)
    }
}

/// Extract up to `max_keywords` keywords from an article title.
///
/// Curated vocabulary matches come first, in pattern order; generic Hangul or
/// Latin tokens that are not stopwords follow in order of appearance.
/// Keywords are lowercased and deduplicated before truncation, so the result
/// is deterministic for a given title and vocabulary.
///
/// # Examples
///
/// ```ignore
/// let kws = extract_keywords("테슬라 모델Y 가격 인하", Vocabulary::builtin());
/// assert_eq!(kws, vec!["테슬라", "모델y", "가격", "인하"]);
/// ```
pub fn extract_keywords(title: &str, vocabulary: &Vocabulary) -> Vec<String> {
    let curated = vocabulary
        .patterns()
        .iter()
        .flat_map(|p| {
            p.regex.find_iter(title).map(move |m| {
                debug!(category = %p.category, keyword = m.as_str(), "Curated match");
                m.as_str().to_string()
            })
        });

    let generic = vocabulary
        .tokens(title)
        .into_iter()
        .filter(|t| !vocabulary.is_stopword(t))
        .map(str::to_string);

    curated
        .chain(generic)
        .map(|k| k.trim().to_lowercase())
        .filter(|k| k.chars().count() >= 2)
        .unique()
        .take(vocabulary.max_keywords())
        .collect()
}

/// Reset the profile if the cleanup interval has elapsed.
///
/// A profile without a readable `last_cleanup` starts a new window at `now`
/// instead of being reset.
///
/// # Returns
///
/// `true` when the profile was reset.
pub fn apply_cleanup(profile: &mut PreferenceProfile, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();
    let Some(last) = profile.last_cleanup else {
        profile.last_cleanup = Some(today);
        return false;
    };

    let elapsed = (today - last).num_days();
    if elapsed < CLEANUP_INTERVAL_DAYS {
        return false;
    }

    info!(
        elapsed_days = elapsed,
        keywords = profile.keyword_weights.len(),
        total_likes = profile.total_likes,
        "Preference profile expired; resetting"
    );
    profile.keyword_weights.clear();
    profile.total_likes = 0;
    profile.last_cleanup = Some(today);
    true
}

/// Apply one like/dislike for `title` to the profile.
///
/// Runs the cleanup check first, then the update rules from the module docs,
/// and stamps `last_updated`. When the title yields no keywords only the
/// cleanup check and the timestamp apply; the caller still persists the
/// returned profile.
pub fn record_feedback(
    mut profile: PreferenceProfile,
    title: &str,
    reaction: Reaction,
    vocabulary: &Vocabulary,
    now: DateTime<Utc>,
) -> PreferenceProfile {
    apply_cleanup(&mut profile, now);

    let keywords = extract_keywords(title, vocabulary);
    if keywords.is_empty() {
        debug!(title, "No keywords extracted; profile unchanged");
    }

    for keyword in &keywords {
        match reaction {
            Reaction::Like => {
                let weight = profile.keyword_weights.entry(keyword.clone()).or_insert(0);
                *weight = weight.saturating_add(1);
                debug!(keyword = %keyword, weight = *weight, "Keyword weight increased");
            }
            Reaction::Dislike => {
                if let Some(weight) = profile.keyword_weights.get_mut(keyword) {
                    *weight = weight.saturating_sub(1);
                    let remaining = *weight;
                    if remaining == 0 {
                        profile.keyword_weights.remove(keyword);
                    }
                    debug!(keyword = %keyword, weight = remaining, "Keyword weight decreased");
                }
            }
        }
    }

    if reaction.is_like() && !keywords.is_empty() {
        profile.total_likes += 1;
    }
    profile.last_updated = Some(now);
    profile
}

/// Read-only copy of the keyword weights for scoring.
pub fn weights_snapshot(profile: &PreferenceProfile) -> BTreeMap<String, u32> {
    profile.keyword_weights.clone()
}

/// The `n` heaviest keywords, heaviest first; ties ordered by keyword.
pub fn top_keywords(weights: &BTreeMap<String, u32>, n: usize) -> Vec<(String, u32)> {
    weights
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
        .take(n)
        .map(|(k, w)| (k.clone(), *w))
        .collect()
}

/// Summary printed by the `stats` subcommand.
#[derive(Debug, Serialize)]
pub struct ProfileStats {
    pub total_likes: u64,
    pub keywords_count: usize,
    pub top_keywords: Vec<KeywordWeight>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: u32,
}

pub fn profile_stats(profile: &PreferenceProfile, top_n: usize) -> ProfileStats {
    ProfileStats {
        total_likes: profile.total_likes,
        keywords_count: profile.keyword_weights.len(),
        top_keywords: top_keywords(&profile.keyword_weights, top_n)
            .into_iter()
            .map(|(keyword, weight)| KeywordWeight { keyword, weight })
            .collect(),
        last_updated: profile.last_updated.map(|ts| ts.to_rfc3339()),
    }
}
