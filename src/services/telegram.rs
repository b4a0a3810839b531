use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::monitor::Notifier;

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self {
            http: Client::new(),
            token,
        }
    }

    fn has_key(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, String> {
        if !self.has_key() {
            return Err("TELEGRAM_API_KEY is missing in .env".to_string());
        }

        let res = self
            .http
            .post(self.url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("Telegram {method} failed: {status} {body}"));
        }

        let envelope = res
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| e.to_string())?;

        if !envelope.ok {
            let desc = envelope.description.unwrap_or_default();
            return Err(format!("Telegram {method} rejected: {desc}"));
        }

        envelope
            .result
            .ok_or_else(|| format!("Telegram {method} returned no result"))
    }

    /// Long-polls for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, String> {
        self.call(
            "getUpdates",
            json!({ "offset": offset, "timeout": timeout_secs }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), String> {
        let _: Message = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    /// Sends `text` with an inline keyboard, one `(label, callback_data)`
    /// button per row.
    pub async fn send_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        rows: Vec<(String, String)>,
    ) -> Result<(), String> {
        let keyboard: Vec<Vec<InlineKeyboardButton>> = rows
            .into_iter()
            .map(|(label, data)| {
                vec![InlineKeyboardButton {
                    text: label,
                    callback_data: data,
                }]
            })
            .collect();

        let _: Message = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                    "reply_markup": { "inline_keyboard": keyboard },
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback(&self, callback_id: &str) -> Result<(), String> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), String> {
        let _: Message = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, user_id: i64, text: &str) -> Result<(), String> {
        self.send_message(user_id, text).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}
