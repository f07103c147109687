//! Turns a like/dislike button press into a preference update.
//!
//! Each event walks `Received -> TitleExtracted -> ProfileUpdated ->
//! Persisted -> Acknowledged`. Any step may end in [`FeedbackOutcome::Failed`];
//! the failure is logged and returned, never raised. The webhook still
//! answers the provider with success, so a failed event is not redelivered
//! and is lost.

use crate::clients::{DocumentStore, Messenger};
use crate::preferences::{Reaction, extract_keywords, record_feedback};
use crate::state::{load_profile, save_profile};
use crate::utils::preview;
use crate::vocabulary::Vocabulary;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Glyph that starts the title line of every article message.
pub const ARTICLE_MARKER: &str = "📰";

static ORDINAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("ordinal pattern is valid"));

/// A button press on an article message.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEvent {
    pub from_user_id: i64,
    pub chat_id: Option<String>,
    pub message_text: String,
    pub reaction: Reaction,
    pub callback_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStage {
    Received,
    TitleExtracted,
    ProfileUpdated,
    Persisted,
    Acknowledged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    /// Nothing to learn from; no state was touched.
    Ignored { reason: &'static str },
    Acknowledged {
        title: String,
        keywords: Vec<String>,
        reaction: Reaction,
    },
    /// The event stopped after `stage` completed.
    Failed { stage: FeedbackStage, error: String },
}

/// Recover the article title from the text of the message the button is on.
///
/// Looks for the first line starting with [`ARTICLE_MARKER`] (optionally
/// wrapped in `*` markup), strips the marker, markup and any `"<n>. "`
/// ordinal, and returns the rest. Returns an empty string when no line
/// carries the marker.
pub fn extract_article_title(message_text: &str) -> String {
    message_text
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim_start())
        .find_map(|line| line.strip_prefix(ARTICLE_MARKER))
        .map(|rest| {
            let unmarked = rest.replace('*', "");
            ORDINAL_PREFIX.replace(unmarked.trim(), "").trim().to_string()
        })
        .unwrap_or_default()
}

/// Chat reply confirming the update.
pub fn acknowledgment_text(title: &str, reaction: Reaction) -> String {
    let short = format!("'{}'", preview(title, 30));
    match reaction {
        Reaction::Like => format!("👍 {short} 반영됨! 비슷한 뉴스 더 보여드릴게요."),
        Reaction::Dislike => format!("👎 {short} 줄일게요."),
    }
}

/// Toast shown on the pressed button.
pub fn callback_text(reaction: Reaction) -> &'static str {
    match reaction {
        Reaction::Like => "👍 좋아요 저장됨",
        Reaction::Dislike => "👎 반영됨",
    }
}

/// Paths and vocabulary shared by every feedback event.
#[derive(Debug, Clone)]
pub struct FeedbackSettings<'a> {
    pub preferences_path: &'a str,
    pub vocabulary: &'a Vocabulary,
}

/// Clear the button spinner with a warning when the update was not saved.
async fn answer_failure<M: Messenger>(messenger: &M, callback_id: &str) {
    if let Err(e) = messenger.answer_callback(callback_id, "⚠️ 저장하지 못했습니다").await {
        warn!(error = %e, "Failed to answer callback");
    }
}

/// Process one feedback event end to end.
#[instrument(level = "info", skip_all, fields(user = event.from_user_id, reaction = ?event.reaction))]
pub async fn handle_feedback<S, M>(
    event: &FeedbackEvent,
    store: &S,
    messenger: &M,
    settings: &FeedbackSettings<'_>,
    now: DateTime<Utc>,
) -> FeedbackOutcome
where
    S: DocumentStore,
    M: Messenger,
{
    debug!(stage = ?FeedbackStage::Received, "Feedback event");
    let title = extract_article_title(&event.message_text);
    if title.is_empty() {
        info!("No article title in message; ignoring");
        return FeedbackOutcome::Ignored {
            reason: "no article title",
        };
    }
    let keywords = extract_keywords(&title, settings.vocabulary);
    info!(%title, ?keywords, stage = ?FeedbackStage::TitleExtracted, "Feedback received");

    let (profile, base) = load_profile(store, settings.preferences_path, now).await;
    if !base.is_writable() {
        warn!("Preference profile could not be read; not updating it");
        answer_failure(messenger, &event.callback_id).await;
        return FeedbackOutcome::Failed {
            stage: FeedbackStage::TitleExtracted,
            error: "preference profile unavailable".to_string(),
        };
    }
    let updated = record_feedback(profile, &title, event.reaction, settings.vocabulary, now);
    debug!(stage = ?FeedbackStage::ProfileUpdated, keywords = updated.keyword_weights.len());

    if let Err(e) = save_profile(store, settings.preferences_path, &updated, &base, now).await {
        warn!(error = %e, "Failed to persist preference profile");
        answer_failure(messenger, &event.callback_id).await;
        return FeedbackOutcome::Failed {
            stage: FeedbackStage::ProfileUpdated,
            error: e.to_string(),
        };
    }
    debug!(stage = ?FeedbackStage::Persisted);

    if let Err(e) = messenger
        .answer_callback(&event.callback_id, callback_text(event.reaction))
        .await
    {
        warn!(error = %e, "Failed to answer callback");
    }
    if let Some(chat_id) = &event.chat_id {
        let text = acknowledgment_text(&title, event.reaction);
        if let Err(e) = messenger.send_message(chat_id, &text, &[]).await {
            warn!(error = %e, "Failed to send acknowledgment");
        }
    }

    info!(
        keywords = updated.keyword_weights.len(),
        total_likes = updated.total_likes,
        stage = ?FeedbackStage::Acknowledged,
        "Feedback applied"
    );
    FeedbackOutcome::Acknowledged {
        title,
        keywords,
        reaction: event.reaction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreferenceProfile;
    use crate::state::PREFERENCES_PATH;
    use crate::testing::{MemoryStore, RecordingMessenger};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
    }

    fn settings() -> FeedbackSettings<'static> {
        FeedbackSettings {
            preferences_path: PREFERENCES_PATH,
            vocabulary: Vocabulary::builtin(),
        }
    }

    fn event(text: &str, reaction: Reaction) -> FeedbackEvent {
        FeedbackEvent {
            from_user_id: 42,
            chat_id: Some("-100123".into()),
            message_text: text.to_string(),
            reaction,
            callback_id: "cb-1".into(),
        }
    }

    fn stored_profile(store: &MemoryStore) -> PreferenceProfile {
        serde_json::from_str(&store.body(PREFERENCES_PATH).unwrap()).unwrap()
    }

    #[test]
    fn test_extract_article_title_variants() {
        assert_eq!(
            extract_article_title("📰 테슬라 모델Y 가격 인하\n\n설명\n\nhttps://x.com/a"),
            "테슬라 모델Y 가격 인하"
        );
        assert_eq!(
            extract_article_title("오늘의 뉴스\n*📰 2. 기아 EV3 출시*\n링크"),
            "기아 EV3 출시"
        );
        assert_eq!(extract_article_title("  📰 12.제네시스 GV90"), "제네시스 GV90");
    }

    #[test]
    fn test_extract_article_title_without_marker() {
        assert_eq!(extract_article_title("그냥 메시지\n두 번째 줄"), "");
        assert_eq!(extract_article_title(""), "");
    }

    #[test]
    fn test_acknowledgment_texts() {
        let like = acknowledgment_text("현대차 아이오닉 9 공개, 3열 전기 SUV 시장 본격 공략", Reaction::Like);
        assert!(like.starts_with("👍 '현대차 아이오닉 9 공개, 3열 전기 SUV 시장 본격..."));
        assert!(acknowledgment_text("짧은 제목", Reaction::Dislike).starts_with("👎 '짧은 제목'"));
        assert_eq!(callback_text(Reaction::Like), "👍 좋아요 저장됨");
    }

    #[tokio::test]
    async fn test_like_updates_and_acknowledges() {
        let store = MemoryStore::default();
        let messenger = RecordingMessenger::default();
        let outcome = handle_feedback(
            &event("📰 테슬라 신차 공개\n\nhttps://x.com/a", Reaction::Like),
            &store,
            &messenger,
            &settings(),
            now(),
        )
        .await;

        match outcome {
            FeedbackOutcome::Acknowledged { title, keywords, .. } => {
                assert_eq!(title, "테슬라 신차 공개");
                assert_eq!(keywords, vec!["테슬라", "신차", "공개"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let profile = stored_profile(&store);
        assert_eq!(profile.keyword_weights.get("테슬라"), Some(&1));
        assert_eq!(profile.total_likes, 1);
        assert_eq!(messenger.callbacks(), vec![("cb-1".to_string(), "👍 좋아요 저장됨".to_string())]);
        assert_eq!(messenger.sent().len(), 1);
        assert_eq!(messenger.sent()[0].chat_id, "-100123");
    }

    #[tokio::test]
    async fn test_dislike_on_weight_one_removes_key() {
        let store = MemoryStore::default();
        store.seed(
            PREFERENCES_PATH,
            r#"{"liked_keywords": {"테슬라": 1, "배터리": 3}, "total_likes": 1, "last_updated": "", "last_cleanup": "2025-08-30"}"#,
        );
        let messenger = RecordingMessenger::default();
        handle_feedback(&event("📰 테슬라", Reaction::Dislike), &store, &messenger, &settings(), now()).await;

        let profile = stored_profile(&store);
        assert!(!profile.keyword_weights.contains_key("테슬라"));
        assert_eq!(profile.keyword_weights.get("배터리"), Some(&3));
        assert!(!store.body(PREFERENCES_PATH).unwrap().contains("\"테슬라\": 0"));
    }

    #[tokio::test]
    async fn test_expired_profile_resets_before_update() {
        let store = MemoryStore::default();
        let cleanup = (now() - Duration::days(31)).format("%Y-%m-%d").to_string();
        store.seed(
            PREFERENCES_PATH,
            &format!(r#"{{"liked_keywords": {{"테슬라": 5}}, "total_likes": 5, "last_cleanup": "{cleanup}"}}"#),
        );
        let messenger = RecordingMessenger::default();
        handle_feedback(&event("📰 테슬라", Reaction::Like), &store, &messenger, &settings(), now()).await;

        let profile = stored_profile(&store);
        assert_eq!(profile.keyword_weights.len(), 1);
        assert_eq!(profile.keyword_weights.get("테슬라"), Some(&1));
        assert_eq!(profile.total_likes, 1);
        assert_eq!(profile.last_cleanup, Some(now().date_naive()));
    }

    #[tokio::test]
    async fn test_message_without_title_is_ignored() {
        let store = MemoryStore::default();
        let messenger = RecordingMessenger::default();
        let outcome = handle_feedback(
            &event("오늘의 요약입니다", Reaction::Like),
            &store,
            &messenger,
            &settings(),
            now(),
        )
        .await;

        assert_eq!(outcome, FeedbackOutcome::Ignored { reason: "no article title" });
        assert_eq!(store.writes(), 0);
        assert!(messenger.callbacks().is_empty());
    }

    #[tokio::test]
    async fn test_title_without_keywords_still_writes() {
        let store = MemoryStore::default();
        let messenger = RecordingMessenger::default();
        let outcome =
            handle_feedback(&event("📰 1. !!!", Reaction::Like), &store, &messenger, &settings(), now()).await;

        assert!(matches!(outcome, FeedbackOutcome::Acknowledged { ref keywords, .. } if keywords.is_empty()));
        assert_eq!(store.writes(), 1);
        assert_eq!(stored_profile(&store).total_likes, 0);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let store = MemoryStore::default();
        store.fail_writes(true);
        let messenger = RecordingMessenger::default();
        let outcome =
            handle_feedback(&event("📰 기아 EV3", Reaction::Like), &store, &messenger, &settings(), now()).await;

        match outcome {
            FeedbackOutcome::Failed { stage, .. } => assert_eq!(stage, FeedbackStage::ProfileUpdated),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(messenger.sent().is_empty());
        assert_eq!(messenger.callbacks().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_profile_is_left_untouched() {
        let store = MemoryStore::default();
        store.seed(
            PREFERENCES_PATH,
            r#"{"liked_keywords": {"테슬라": 9, "배터리": 7, "bmw": 4}, "total_likes": 20, "last_cleanup": "2025-08-30"}"#,
        );
        store.fail_next_read(PREFERENCES_PATH);
        let messenger = RecordingMessenger::default();
        let outcome =
            handle_feedback(&event("📰 기아 EV3", Reaction::Like), &store, &messenger, &settings(), now()).await;

        match outcome {
            FeedbackOutcome::Failed { stage, .. } => assert_eq!(stage, FeedbackStage::TitleExtracted),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.writes(), 0);
        let profile = stored_profile(&store);
        assert_eq!(profile.keyword_weights.get("테슬라"), Some(&9));
        assert_eq!(profile.total_likes, 20);
        assert!(messenger.sent().is_empty());
        assert_eq!(messenger.callbacks(), vec![("cb-1".to_string(), "⚠️ 저장하지 못했습니다".to_string())]);
    }

    #[tokio::test]
    async fn test_ack_failures_do_not_fail_event() {
        let store = MemoryStore::default();
        let messenger = RecordingMessenger {
            fail_on: Some("반영됨".into()),
            fail_callbacks: true,
            ..RecordingMessenger::default()
        };
        let outcome =
            handle_feedback(&event("📰 기아 EV3", Reaction::Like), &store, &messenger, &settings(), now()).await;

        assert!(matches!(outcome, FeedbackOutcome::Acknowledged { .. }));
        assert_eq!(store.writes(), 1);
    }
}
