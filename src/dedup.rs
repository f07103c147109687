//! Duplicate filtering for candidate articles.
//!
//! A candidate survives when it has both a title and a URL, its normalized
//! URL is absent from the sent history, and neither its normalized URL nor
//! its normalized title was already accepted earlier in the same batch. The
//! title check catches syndicated copies whose URLs differ only in tracking;
//! titles that normalize to nothing are compared by URL only.

use crate::models::{Article, SentHistory};
use crate::normalize::NormalizedKey;
use crate::ranking::Scorable;
use std::collections::HashSet;
use tracing::{debug, info};

/// An article that passed the filter, with its comparison key.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub article: Article,
    pub key: NormalizedKey,
}

impl Scorable for Candidate {
    fn title(&self) -> &str {
        self.article.title_str()
    }

    fn description(&self) -> &str {
        self.article.description_str()
    }
}

/// Counters for the log line; they do not affect filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub kept: usize,
    pub missing_fields: usize,
    pub url_duplicates: usize,
    pub title_duplicates: usize,
}

/// Keep the novel candidates, in input order.
pub fn filter_novel(
    candidates: Vec<Article>,
    history: &SentHistory,
) -> (Vec<Candidate>, DedupReport) {
    let mut report = DedupReport::default();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(candidates.len());

    for article in candidates {
        let (url, title) = (article.url_str().trim(), article.title_str().trim());
        if url.is_empty() || title.is_empty() {
            report.missing_fields += 1;
            continue;
        }

        let key = NormalizedKey::new(url, title);
        if history.contains(&key.url) || seen_urls.contains(&key.url) {
            debug!(url = %key.url, "Skipping duplicate URL");
            report.url_duplicates += 1;
            continue;
        }
        // A title of only punctuation normalizes to nothing and matches nothing.
        if !key.title.is_empty() && seen_titles.contains(&key.title) {
            debug!(title = %key.title, "Skipping duplicate title");
            report.title_duplicates += 1;
            continue;
        }

        seen_urls.insert(key.url.clone());
        if !key.title.is_empty() {
            seen_titles.insert(key.title.clone());
        }
        kept.push(Candidate { article, key });
    }

    report.kept = kept.len();
    info!(
        kept = report.kept,
        history = history.len(),
        url_duplicates = report.url_duplicates,
        title_duplicates = report.title_duplicates,
        missing_fields = report.missing_fields,
        "Deduplicated candidates"
    );
    (kept, report)
}
