//! Receipt relay: classifies inbound messages and forwards receipt data.
//!
//! `Relay` is the per-process context: it owns the upstream API handle and
//! the mini-app URL, and is shared by every message task. It holds no
//! mutable state.

pub mod classify;
pub mod forward;
pub mod reply;

use std::sync::Arc;

pub use classify::{Classification, Command, classify};
pub use forward::{ForwardRequest, ForwardResult, HttpReceiptApi, ReceiptApi, forward};
pub use reply::reply;

use crate::channels::{IncomingMessage, OutgoingResponse};
use crate::config::BotConfig;
use crate::error::ConfigError;

pub struct Relay {
    api: Arc<dyn ReceiptApi>,
    webapp_url: String,
    bot_username: Option<String>,
}

impl Relay {
    pub fn new(api: Arc<dyn ReceiptApi>, webapp_url: impl Into<String>) -> Self {
        Self {
            api,
            webapp_url: webapp_url.into(),
            bot_username: None,
        }
    }

    /// Only answer `/command@name` mentions addressed to `username`.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Build a relay talking HTTP to the configured upstream.
    pub fn from_config(config: &BotConfig) -> Result<Self, ConfigError> {
        let api = HttpReceiptApi::new(&config.api_base, config.forward_timeout)?;
        Ok(Self::new(Arc::new(api), config.webapp_url.clone()))
    }

    /// Process one message: classify, forward if eligible, build the reply.
    pub async fn handle(&self, message: &IncomingMessage) -> Option<OutgoingResponse> {
        let classification = classify(message, self.bot_username.as_deref());

        let result = match classification.payload() {
            Some(payload) => {
                tracing::info!(
                    channel = %message.channel,
                    sender = message.sender_id.as_deref().unwrap_or("unknown"),
                    kind = kind(&classification),
                    "Forwarding receipt"
                );
                Some(forward(self.api.as_ref(), payload, message.sender_id.as_deref()).await)
            }
            None => None,
        };

        let text = reply(&classification, result.as_ref())?;
        let response = OutgoingResponse::text(text);

        Some(match classification {
            Classification::Command(Command::Scan) => {
                response.with_web_app_button(reply::SCAN_BUTTON_TEXT, &self.webapp_url)
            }
            _ => response,
        })
    }
}

fn kind(classification: &Classification) -> &'static str {
    match classification {
        Classification::Command(_) => "command",
        Classification::StructuredPayload(_) => "web_app_data",
        Classification::PatternMatch(_) => "text",
        Classification::Unmatched => "unmatched",
    }
}
