//! Telegram Bot API adapter.

use super::{InlineButton, Messenger};
use crate::error::BotError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "telegram";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Client for `https://api.telegram.org/bot<token>/...`.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

/// `reply_markup` with all buttons on a single row.
fn inline_keyboard(buttons: &[InlineButton]) -> Value {
    let row: Vec<Value> = buttons
        .iter()
        .map(|b| json!({ "text": b.text, "callback_data": b.payload }))
        .collect();
    json!({ "inline_keyboard": [row] })
}

impl TelegramClient {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, BotError> {
        Self::with_base_url(&format!("https://api.telegram.org/bot{bot_token}"), timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<(), BotError> {
        let resp = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(payload)
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

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok => {
                debug!(method, "Telegram call succeeded");
                Ok(())
            }
            Ok(api) => Err(BotError::status(
                SERVICE,
                status.as_u16(),
                api.description.as_deref().unwrap_or("ok=false"),
            )),
            Err(e) => Err(BotError::MalformedDocument {
                path: method.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Messenger for TelegramClient {
    #[instrument(level = "info", skip_all, fields(%chat_id))]
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<(), BotError> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if !buttons.is_empty() {
            payload["reply_markup"] = inline_keyboard(buttons);
        }
        self.call("sendMessage", &payload).await
    }

    #[instrument(level = "info", skip_all, fields(%callback_id))]
    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), BotError> {
        let payload = json!({
            "callback_query_id": callback_id,
            "text": text,
            "show_alert": false,
        });
        self.call("answerCallbackQuery", &payload).await
    }
}
