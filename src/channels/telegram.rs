//! Telegram channel — long-polls the Bot API for updates.
//!
//! Native Rust Telegram Bot API implementation: getUpdates long polling,
//! sendMessage with an optional inline `web_app` button, getMe health check.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Public Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Slack on top of the long-poll timeout before the HTTP request is abandoned.
const POLL_REQUEST_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub web_app_data: Option<WebAppData>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetMeResponse {
    ok: bool,
    #[serde(default)]
    result: Option<TelegramUser>,
}

/// Data a mini-app sent back with `Telegram.WebApp.sendData`.
#[derive(Debug, Deserialize)]
pub struct WebAppData {
    pub data: String,
}

/// Telegram channel, connected to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    api_base: String,
    poll_timeout: Duration,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, poll_timeout: Duration) -> Self {
        Self {
            bot_token,
            api_base: TELEGRAM_API_BASE.to_string(),
            poll_timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Fetch the bot's own account via getMe.
    pub async fn get_me(&self) -> Result<TelegramUser, ChannelError> {
        let startup_failed = |reason: String| ChannelError::StartupFailed {
            name: "telegram".into(),
            reason,
        };

        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| startup_failed(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            return Err(startup_failed(format!("getMe returned {}", resp.status())));
        }

        let data: GetMeResponse = resp
            .json()
            .await
            .map_err(|e| startup_failed(format!("getMe parse error: {}", e.without_url())))?;

        match data.result {
            Some(me) if data.ok => Ok(me),
            _ => Err(startup_failed("getMe returned ok: false".into())),
        }
    }

    /// Send a text message, splitting it if it exceeds Telegram's 4096 char
    /// limit. The mini-app button, if any, is attached to the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        response: &OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(&response.content, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last {
                if let Some(button) = &response.web_app_button {
                    body["reply_markup"] = serde_json::json!({
                        "inline_keyboard": [[{
                            "text": button.text,
                            "web_app": { "url": button.url }
                        }]]
                    });
                }
            }

            let resp = self
                .client
                .post(self.api_url("sendMessage"))
                .json(&body)
                .send()
                .await
                .map_err(|e| ChannelError::SendFailed {
                    name: "telegram".into(),
                    reason: e.without_url().to_string(),
                })?;

            if !resp.status().is_success() {
                let status = resp.status();
                let err = resp.text().await.unwrap_or_default();
                return Err(ChannelError::SendFailed {
                    name: "telegram".into(),
                    reason: format!("sendMessage returned {status}: {err}"),
                });
            }
        }

        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let poll_secs = self.poll_timeout.as_secs();
        let request_timeout = self.poll_timeout + POLL_REQUEST_GRACE;
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": poll_secs,
                    "allowed_updates": ["message"]
                });

                let resp = match client
                    .post(&url)
                    .timeout(request_timeout)
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {}", e.without_url());
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: GetUpdatesResponse = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {}", e.without_url());
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                if !data.ok {
                    tracing::warn!("Telegram getUpdates returned ok: false");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }

                for update in data.result {
                    // Advance offset past this update
                    offset = offset.max(update.update_id + 1);

                    let Some(incoming) = incoming_from_update(update) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if msg.chat_id.is_empty() {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "Message has no chat_id".into(),
            });
        }

        self.send_message(&msg.chat_id, &response).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        self.get_me().await.map(|_| ())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Convert an update into an inbound message.
///
/// Only `message` updates carrying text or mini-app data are kept.
fn incoming_from_update(update: TelegramUpdate) -> Option<IncomingMessage> {
    let message = update.message?;
    if message.text.is_none() && message.web_app_data.is_none() {
        return None;
    }

    Some(IncomingMessage {
        channel: "telegram".into(),
        chat_id: message.chat.id.to_string(),
        sender_id: message.from.map(|u| u.id.to_string()),
        text: message.text,
        structured_payload: message.web_app_data.map(|d| d.data),
    })
}

/// Split a message into chunks that fit Telegram's length limit, measured
/// in UTF-16 code units. Tries to split on newlines, then spaces, then
/// hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        let Some(limit) = utf16_boundary(remaining, max_len) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

/// Byte offset of the first char that would push `text` past `max_units`
/// UTF-16 code units, or `None` if it all fits.
fn utf16_boundary(text: &str, max_units: usize) -> Option<usize> {
    let mut units = 0;
    for (i, c) in text.char_indices() {
        units += c.len_utf16();
        if units > max_units {
            return Some(i);
        }
    }
    None
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(token: &str) -> TelegramChannel {
        TelegramChannel::new(SecretString::from(token.to_string()), Duration::from_secs(30))
    }

    fn parse_update(json: serde_json::Value) -> TelegramUpdate {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn telegram_channel_name() {
        assert_eq!(channel("fake-token").name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            channel("123:ABC").api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn telegram_api_url_custom_base() {
        let ch = channel("123:ABC").with_api_base("http://127.0.0.1:9000/");
        assert_eq!(
            ch.api_url("sendMessage"),
            "http://127.0.0.1:9000/bot123:ABC/sendMessage"
        );
    }

    // ── Update conversion ───────────────────────────────────────────

    #[test]
    fn text_update_becomes_incoming_message() {
        let update = parse_update(serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": { "id": 555 },
                "from": { "id": 12345, "first_name": "Ann" },
                "text": "t=1 fn=2"
            }
        }));

        let msg = incoming_from_update(update).unwrap();
        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.chat_id, "555");
        assert_eq!(msg.sender_id.as_deref(), Some("12345"));
        assert_eq!(msg.text.as_deref(), Some("t=1 fn=2"));
        assert!(msg.structured_payload.is_none());
    }

    #[test]
    fn web_app_update_carries_structured_payload() {
        let update = parse_update(serde_json::json!({
            "update_id": 11,
            "message": {
                "chat": { "id": -100 },
                "from": { "id": 7 },
                "web_app_data": { "data": "qr-raw", "button_text": "scan" }
            }
        }));

        let msg = incoming_from_update(update).unwrap();
        assert_eq!(msg.chat_id, "-100");
        assert_eq!(msg.structured_payload.as_deref(), Some("qr-raw"));
        assert!(msg.text.is_none());
    }

    #[test]
    fn update_without_sender_has_no_sender_id() {
        let update = parse_update(serde_json::json!({
            "update_id": 12,
            "message": { "chat": { "id": 1 }, "text": "hello" }
        }));
        assert!(incoming_from_update(update).unwrap().sender_id.is_none());
    }

    #[test]
    fn non_message_updates_are_skipped() {
        let update = parse_update(serde_json::json!({
            "update_id": 13,
            "edited_message": { "chat": { "id": 1 }, "text": "x" }
        }));
        assert!(incoming_from_update(update).is_none());
    }

    #[test]
    fn sticker_only_message_is_skipped() {
        let update = parse_update(serde_json::json!({
            "update_id": 14,
            "message": { "chat": { "id": 1 }, "sticker": { "file_id": "abc" } }
        }));
        assert!(incoming_from_update(update).is_none());
    }

    // ── Respond requires a chat ─────────────────────────────────────

    #[tokio::test]
    async fn respond_without_chat_id_fails() {
        let ch = channel("fake-token");
        let msg = IncomingMessage::new("telegram", "");
        let err = ch
            .respond(&msg, OutgoingResponse::text("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("chat_id"));
    }

    // ── Message splitting tests ─────────────────────────────────────

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_over_limit_on_space() {
        let msg = format!("{} {}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }

    #[test]
    fn split_message_counts_utf16_units() {
        // Each emoji is a surrogate pair: two UTF-16 units
        let msg = "😀".repeat(3000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 2048);
        assert_eq!(chunks[1].chars().count(), 952);
        assert!(chunks.iter().all(|c| c.encode_utf16().count() <= 4096));
    }

    #[test]
    fn split_message_counts_chars_not_bytes() {
        // Cyrillic letters are two bytes each in UTF-8
        let msg = "ч".repeat(3000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);

        let msg = "ч".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 4096);
        assert_eq!(chunks[1].chars().count(), 904);
    }
}
