//! Inbound webhook surface.
//!
//! Classifies one raw Telegram `Update` body into a feedback event or an
//! ignored update, and renders the JSON body returned to Telegram. The
//! response is always a success so Telegram never redelivers.

use crate::feedback::{FeedbackEvent, FeedbackOutcome, FeedbackStage};
use crate::preferences::Reaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Update {
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<Message>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Result of classifying an update body.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundUpdate {
    Feedback(FeedbackEvent),
    Ignored(&'static str),
}

/// Map a callback payload to a reaction.
///
/// Matching is by prefix, so `like_<id>` and `like:<json>` count as likes.
pub fn classify_payload(payload: &str) -> Option<Reaction> {
    let payload = payload.trim().to_lowercase();
    if payload.starts_with("dislike") {
        Some(Reaction::Dislike)
    } else if payload.starts_with("like") {
        Some(Reaction::Like)
    } else {
        None
    }
}

/// Classify a raw update body. Never fails; anything unrecognized is ignored.
pub fn parse_update(body: &str) -> InboundUpdate {
    let update: Update = match serde_json::from_str(body) {
        Ok(update) => update,
        Err(_) => return InboundUpdate::Ignored("unparseable update"),
    };
    let Some(query) = update.callback_query else {
        return InboundUpdate::Ignored("not a callback query");
    };
    let Some(reaction) = query.data.as_deref().and_then(classify_payload) else {
        return InboundUpdate::Ignored("not a feedback payload");
    };

    let (chat_id, message_text) = match query.message {
        Some(message) => (
            Some(message.chat.id.to_string()),
            message.text.unwrap_or_default(),
        ),
        None => (None, String::new()),
    };

    InboundUpdate::Feedback(FeedbackEvent {
        from_user_id: query.from.id,
        chat_id,
        message_text,
        reaction,
        callback_id: query.id,
    })
}

/// JSON body returned for every webhook request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<FeedbackStage>,
}

impl WebhookResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            note: None,
            status: None,
            stage: None,
        }
    }

    pub fn ignored(note: &'static str) -> Self {
        Self {
            note: Some(note),
            ..Self::ok()
        }
    }

    pub fn failed(stage: FeedbackStage) -> Self {
        Self {
            status: Some("failed"),
            stage: Some(stage),
            ..Self::ok()
        }
    }
}

impl From<&FeedbackOutcome> for WebhookResponse {
    fn from(outcome: &FeedbackOutcome) -> Self {
        match outcome {
            FeedbackOutcome::Acknowledged { .. } => Self::ok(),
            FeedbackOutcome::Ignored { reason } => Self::ignored(*reason),
            FeedbackOutcome::Failed { stage, .. } => Self::failed(*stage),
        }
    }
}
