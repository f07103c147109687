//! News search API adapter and personalized query building.
//!
//! Articles come from the `everything` endpoint of a NewsAPI-compatible
//! service, filtered by language and a recency window and sorted newest
//! first. The keyword expression combines the user's heaviest liked keywords
//! with a fixed automotive base query.

use super::{NewsSource, SearchQuery};
use crate::error::BotError;
use crate::models::Article;
use crate::preferences::top_keywords;
use crate::vocabulary::Vocabulary;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};

const SERVICE: &str = "news";

/// Query used when nothing has been liked yet.
pub const BASE_QUERY: &str = "자동차 OR 현대차 OR EV OR 배터리 OR 모빌리티 OR 기아";

/// Build the search expression from the profile weights.
///
/// The `limit` heaviest keywords are mapped through the vocabulary's synonym
/// table, quoted when they contain spaces, OR-joined, and combined with the
/// base query as `(liked) OR (base)`. Without liked keywords the base query
/// is returned unchanged.
pub fn personalized_expression(
    weights: &BTreeMap<String, u32>,
    base_query: &str,
    limit: usize,
    vocabulary: &Vocabulary,
) -> String {
    let liked: Vec<String> = top_keywords(weights, limit)
        .into_iter()
        .map(|(keyword, _)| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .map(|keyword| {
            let term = vocabulary
                .synonym(&keyword)
                .map(str::to_string)
                .unwrap_or(keyword);
            if term.contains(' ') {
                format!("\"{term}\"")
            } else {
                term
            }
        })
        .collect();

    if liked.is_empty() {
        base_query.to_string()
    } else {
        format!("({}) OR ({})", liked.join(" OR "), base_query)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    articles: Option<Vec<Article>>,
    #[serde(default)]
    total_results: Option<u64>,
}

/// Client for the news search API.
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, BotError> {
        Self::with_base_url(api_key, "https://newsapi.org", timeout)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl NewsSource for NewsApiClient {
    #[instrument(level = "info", skip_all, fields(q = %query.expression))]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Article>, BotError> {
        let url = format!("{}/v2/everything", self.base_url);
        let from = query.from.to_rfc3339_opts(SecondsFormat::Secs, true);
        let page_size = query.page_size.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", query.expression.as_str()),
                ("language", query.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("from", from.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;
        if !status.is_success() {
            return Err(BotError::status(SERVICE, status.as_u16(), &body));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| BotError::MalformedDocument {
                path: url.clone(),
                reason: e.to_string(),
            })?;
        let articles = parsed.articles.unwrap_or_default();

        info!(
            fetched = articles.len(),
            total = parsed.total_results.unwrap_or_default(),
            since = %from,
            "Fetched news candidates"
        );
        Ok(articles)
    }
}
