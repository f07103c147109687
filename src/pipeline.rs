//! The daily run.
//!
//! fetch -> dedup against history and the batch -> rank by the profile ->
//! send the top picks one by one -> record what was sent -> save history once.
//!
//! Sends are best effort: a failed send is logged and skipped, and only
//! successfully sent URLs reach the history. The history write happens after
//! all sends and is not transactional with them, so a failed write (or a
//! crash before it) means those articles may be sent again on a later run.

use crate::clients::{DocumentStore, InlineButton, Messenger, NewsSource, SearchQuery};
use crate::clients::news::personalized_expression;
use crate::dedup::{Candidate, DedupReport, filter_novel};
use crate::error::BotError;
use crate::preferences::weights_snapshot;
use crate::ranking::{Ranked, rank, top_k};
use crate::state::{load_history, load_profile, save_history};
use crate::vocabulary::Vocabulary;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};

/// Everything the daily run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct DailySettings {
    pub chat_id: String,
    pub top_k: usize,
    pub page_size: u32,
    pub language: String,
    /// Only articles newer than this are requested.
    pub recency: Duration,
    /// Sent-history entries older than this are forgotten.
    pub retention: Duration,
    pub base_query: String,
    /// How many liked keywords go into the search query.
    pub query_keywords: usize,
    pub preferences_path: String,
    pub history_path: String,
}

/// What a daily run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyReport {
    pub fetched: usize,
    pub dedup: DedupReport,
    pub sent: usize,
    pub failed: usize,
    /// `false` when nothing was written, either because nothing was sent or
    /// because the write failed.
    pub history_saved: bool,
}

/// Render the message for one article. The first line carries the marker
/// that feedback handling later uses to recover the title.
pub fn article_message(candidate: &Candidate) -> String {
    let article = &candidate.article;
    format!(
        "📰 {}\n\n{}\n\n{}",
        article.title_str().trim(),
        article.description_str().trim(),
        article.url_str().trim()
    )
}

pub fn feedback_buttons() -> Vec<InlineButton> {
    vec![
        InlineButton {
            text: "👍 좋아요".into(),
            payload: "like".into(),
        },
        InlineButton {
            text: "👎 싫어요".into(),
            payload: "dislike".into(),
        },
    ]
}

/// Run the daily pipeline once.
///
/// # Errors
///
/// Only a failed news fetch is an error; it aborts before anything is sent.
/// Store read failures degrade to empty documents and send or write
/// failures are reported in the [`DailyReport`].
#[instrument(level = "info", skip_all, fields(chat_id = %settings.chat_id))]
pub async fn run_daily<N, M, S>(
    news: &N,
    messenger: &M,
    store: &S,
    vocabulary: &Vocabulary,
    settings: &DailySettings,
    now: DateTime<Utc>,
) -> Result<DailyReport, BotError>
where
    N: NewsSource,
    M: Messenger,
    S: DocumentStore,
{
    let (profile, _) = load_profile(store, &settings.preferences_path, now).await;
    let weights = weights_snapshot(&profile);

    let query = SearchQuery {
        expression: personalized_expression(
            &weights,
            &settings.base_query,
            settings.query_keywords,
            vocabulary,
        ),
        language: settings.language.clone(),
        from: now - settings.recency,
        page_size: settings.page_size,
    };
    info!(q = %query.expression, liked = weights.len(), "Searching news");

    let articles = news.search(&query).await?;
    let mut report = DailyReport {
        fetched: articles.len(),
        ..DailyReport::default()
    };

    let (mut history, history_base) =
        load_history(store, &settings.history_path, now, settings.retention).await;
    let (novel, dedup) = filter_novel(articles, &history);
    report.dedup = dedup;
    if novel.is_empty() {
        info!(fetched = report.fetched, "No new articles; nothing to send");
        return Ok(report);
    }

    let picks: Vec<Ranked<Candidate>> = top_k(rank(novel, &weights), settings.top_k);
    let keyboard = feedback_buttons();
    let buttons = keyboard.as_slice();

    let results: Vec<(Ranked<Candidate>, Result<(), BotError>)> = stream::iter(picks)
        .then(|pick| async move {
            let text = article_message(&pick.item);
            let result = messenger
                .send_message(&settings.chat_id, &text, buttons)
                .await;
            (pick, result)
        })
        .collect()
        .await;

    for (pick, result) in results {
        let title = pick.item.article.title_str();
        match result {
            Ok(()) => {
                info!(score = pick.score, %title, "Sent article");
                history.record(pick.item.key.url, now);
                report.sent += 1;
            }
            Err(e) => {
                warn!(score = pick.score, %title, error = %e, "Failed to send article");
                report.failed += 1;
            }
        }
    }

    if report.sent > 0 {
        match save_history(store, &settings.history_path, &history, &history_base, now).await {
            Ok(()) => report.history_saved = true,
            Err(e) => {
                error!(error = %e, sent = report.sent, "Failed to save sent history; articles may be resent");
            }
        }
    }

    info!(
        fetched = report.fetched,
        sent = report.sent,
        failed = report.failed,
        history_saved = report.history_saved,
        "Daily run finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::news::BASE_QUERY;
    use crate::models::SentHistory;
    use crate::state::{PREFERENCES_PATH, SENT_HISTORY_PATH};
    use crate::testing::{FixedNews, MemoryStore, RecordingMessenger, article};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
    }

    fn settings() -> DailySettings {
        DailySettings {
            chat_id: "-100123".into(),
            top_k: 4,
            page_size: 20,
            language: "ko".into(),
            recency: Duration::hours(36),
            retention: Duration::days(7),
            base_query: BASE_QUERY.into(),
            query_keywords: 6,
            preferences_path: PREFERENCES_PATH.into(),
            history_path: SENT_HISTORY_PATH.into(),
        }
    }

    fn stored_history(store: &MemoryStore) -> SentHistory {
        serde_json::from_str(&store.body(SENT_HISTORY_PATH).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_tracking_variants_send_once() {
        let news = FixedNews::new(vec![
            article("기아 EV3 출시", "https://x.com/a?utm_source=naver", None),
            article("기아 EV3 출시", "https://x.com/a", None),
        ]);
        let messenger = RecordingMessenger::default();
        let store = MemoryStore::default();

        let report = run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings(), now())
            .await
            .unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.sent, 1);
        let sent = messenger.sent();
        assert_eq!(sent[0].text, "📰 기아 EV3 출시\n\n\n\nhttps://x.com/a?utm_source=naver");
        assert_eq!(sent[0].buttons, feedback_buttons());
        let history = stored_history(&store);
        assert!(history.contains("https://x.com/a"));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_ranked_by_profile_and_capped() {
        let store = MemoryStore::default();
        store.seed(
            PREFERENCES_PATH,
            r#"{"liked_keywords": {"테슬라": 3, "배터리": 1}, "total_likes": 4, "last_cleanup": "2025-08-20"}"#,
        );
        let news = FixedNews::new(vec![
            article("국내 완성차 판매 동향", "https://n.com/1", None),
            article("배터리 공급망 점검", "https://n.com/2", None),
            article("테슬라 신형 배터리", "https://n.com/3", None),
            article("중고차 시세", "https://n.com/4", None),
            article("테슬라 모델Y 가격", "https://n.com/5", Some("배터리 교체")),
        ]);
        let messenger = RecordingMessenger::default();
        let mut settings = settings();
        settings.top_k = 3;

        let report = run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings, now())
            .await
            .unwrap();

        assert_eq!(report.sent, 3);
        let urls: Vec<_> = messenger
            .sent()
            .iter()
            .map(|m| m.text.lines().last().unwrap_or_default().to_string())
            .collect();
        assert_eq!(urls, vec!["https://n.com/3", "https://n.com/5", "https://n.com/2"]);

        let query = &news.queries.lock().unwrap()[0];
        assert_eq!(query.expression, format!("(테슬라 OR 배터리) OR ({BASE_QUERY})"));
        assert_eq!(query.from, now() - Duration::hours(36));
    }

    #[tokio::test]
    async fn test_failed_send_is_skipped_and_not_recorded() {
        let news = FixedNews::new(vec![
            article("현대차 노조 파업", "https://n.com/1", None),
            article("기아 EV3 출시", "https://n.com/2", None),
            article("제네시스 GV90 공개", "https://n.com/3", None),
        ]);
        let messenger = RecordingMessenger::failing_on("EV3");
        let store = MemoryStore::default();

        let report = run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings(), now())
            .await
            .unwrap();

        assert_eq!((report.sent, report.failed), (2, 1));
        assert!(report.history_saved);
        let history = stored_history(&store);
        assert!(history.contains("https://n.com/1"));
        assert!(!history.contains("https://n.com/2"));
        assert!(history.contains("https://n.com/3"));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_already_sent_batch_is_a_no_op() {
        let store = MemoryStore::default();
        store.seed(SENT_HISTORY_PATH, r#"{"https://n.com/1": "2025-08-31T10:00:00Z"}"#);
        let news = FixedNews::new(vec![
            article("현대차 노조 파업", "https://n.com/1/?utm_medium=rss", None),
            article("", "https://n.com/2", None),
        ]);
        let messenger = RecordingMessenger::default();

        let report = run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings(), now())
            .await
            .unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.dedup.url_duplicates, 1);
        assert_eq!(report.dedup.missing_fields, 1);
        assert!(messenger.sent().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_sending() {
        let news = FixedNews {
            fail: true,
            ..FixedNews::default()
        };
        let messenger = RecordingMessenger::default();
        let store = MemoryStore::default();

        let result =
            run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings(), now()).await;

        assert!(matches!(result, Err(BotError::Timeout { .. })));
        assert!(messenger.sent().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_history_write_failure_is_reported() {
        let news = FixedNews::new(vec![article("기아 EV3 출시", "https://n.com/2", None)]);
        let messenger = RecordingMessenger::default();
        let store = MemoryStore::default();
        store.fail_writes(true);

        let report = run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings(), now())
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        assert!(!report.history_saved);
    }

    #[tokio::test]
    async fn test_unreadable_history_is_not_overwritten() {
        let stored = r#"{"https://n.com/1": "2025-08-31T10:00:00Z", "https://n.com/7": "2025-08-30T10:00:00Z"}"#;
        let store = MemoryStore::default();
        store.seed(SENT_HISTORY_PATH, stored);
        store.fail_next_read(SENT_HISTORY_PATH);
        let news = FixedNews::new(vec![article("기아 EV3 출시", "https://n.com/2", None)]);
        let messenger = RecordingMessenger::default();

        let report = run_daily(&news, &messenger, &store, Vocabulary::builtin(), &settings(), now())
            .await
            .unwrap();

        assert_eq!(report.sent, 1);
        assert!(!report.history_saved);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.body(SENT_HISTORY_PATH).unwrap(), stored);
    }
}
