//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a chat transport.
///
/// Read-only once built; the relay consumes it and drops it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Source channel name ("telegram").
    pub channel: String,
    /// Chat to reply into.
    pub chat_id: String,
    /// Sender identity, if the transport exposed one.
    pub sender_id: Option<String>,
    /// Free-form text typed by the user.
    pub text: Option<String>,
    /// Opaque data sent by an embedded mini-application.
    pub structured_payload: Option<String>,
}

impl IncomingMessage {
    pub fn new(channel: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_structured_payload(mut self, payload: impl Into<String>) -> Self {
        self.structured_payload = Some(payload.into());
        self
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }
}

/// Button that opens a mini-application inside the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppButton {
    pub text: String,
    pub url: String,
}

/// A reply to send back on the channel a message arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    pub web_app_button: Option<WebAppButton>,
}

impl OutgoingResponse {
    /// Plain text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            web_app_button: None,
        }
    }

    /// Attach a mini-app button below the reply.
    pub fn with_web_app_button(mut self, text: impl Into<String>, url: impl Into<String>) -> Self {
        self.web_app_button = Some(WebAppButton {
            text: text.into(),
            url: url.into(),
        });
        self
    }
}

/// A chat transport: delivers inbound messages and accepts replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, used in logs.
    fn name(&self) -> &str;

    /// Begin receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to the chat `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Verify the transport is reachable and credentials are valid.
    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Release transport resources.
    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
