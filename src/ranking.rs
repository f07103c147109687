//! Relevance scoring and ranking against the learned keyword weights.
//!
//! Scoring is an existence test: a keyword contributes its weight once if it
//! appears anywhere in the lowercased `title + description`, no matter how
//! many times it repeats.

use crate::models::Article;
use std::collections::BTreeMap;

/// Number of articles delivered per daily run unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// An article with its relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: u64,
}

/// Anything that exposes the text an article is scored on.
pub trait Scorable {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
}

impl Scorable for Article {
    fn title(&self) -> &str {
        self.title_str()
    }

    fn description(&self) -> &str {
        self.description_str()
    }
}

/// Sum of the weights of every keyword found in the article text.
pub fn score<A: Scorable>(article: &A, weights: &BTreeMap<String, u32>) -> u64 {
    let text = format!("{} {}", article.title(), article.description()).to_lowercase();
    weights
        .iter()
        .filter(|(keyword, _)| {
            let keyword = keyword.trim().to_lowercase();
            !keyword.is_empty() && text.contains(&keyword)
        })
        .map(|(_, weight)| u64::from(*weight))
        .sum()
}

/// Score and order candidates, highest first.
///
/// The sort is stable: equal scores keep their input order, which for the
/// news feed is newest first.
pub fn rank<A: Scorable>(candidates: Vec<A>, weights: &BTreeMap<String, u32>) -> Vec<Ranked<A>> {
    let mut ranked: Vec<Ranked<A>> = candidates
        .into_iter()
        .map(|item| {
            let score = score(&item, weights);
            Ranked { item, score }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// The first `min(k, len)` entries of an already ranked list.
pub fn top_k<T>(mut ranked: Vec<Ranked<T>>, k: usize) -> Vec<Ranked<T>> {
    ranked.truncate(k);
    ranked
}
