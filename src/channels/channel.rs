//! Channel trait and the message types exchanged with a chat transport.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// A text message.
    Text(String),
    /// A tap on a button this bot attached to one of its messages.
    Tap {
        /// Transport id used to acknowledge the tap.
        callback_id: String,
        /// Opaque payload chosen when the button was sent.
        payload: String,
        /// Id of the message carrying the button, if known.
        message_id: Option<String>,
    },
}

/// An inbound event from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Channel that produced the event.
    pub channel: String,
    /// Stable per-user identifier.
    pub user_id: String,
    /// Where replies go.
    pub chat_id: String,
    /// Display name, when the transport provides one.
    pub user_name: Option<String>,
    pub kind: InboundKind,
}

impl InboundEvent {
    pub fn text(channel: &str, user_id: &str, chat_id: &str, text: &str) -> Self {
        Self {
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
            user_name: None,
            kind: InboundKind::Text(text.to_string()),
        }
    }

    pub fn tap(
        channel: &str,
        user_id: &str,
        chat_id: &str,
        callback_id: &str,
        payload: &str,
        message_id: Option<&str>,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
            user_name: None,
            kind: InboundKind::Tap {
                callback_id: callback_id.to_string(),
                payload: payload.to_string(),
                message_id: message_id.map(String::from),
            },
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }
}

/// A tappable button with an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Interactive elements attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Markup {
    #[default]
    None,
    /// Buttons attached to the message, in rows.
    Buttons(Vec<Vec<Button>>),
    /// Quick-reply choices that send their label as a text message, in rows.
    Choices(Vec<Vec<String>>),
    /// Hide previously offered quick-reply choices.
    ClearChoices,
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub markup: Markup,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: Markup::None,
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }

    /// All buttons, flattened in row order.
    pub fn buttons(&self) -> Vec<&Button> {
        match &self.markup {
            Markup::Buttons(rows) => rows.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

/// Stream of inbound events.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// A chat transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send a message; returns the transport-assigned message id.
    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<String, ChannelError>;

    /// Replace the text of a sent message (its buttons are dropped).
    async fn edit_text(&self, chat_id: &str, message_id: &str, text: &str) -> Result<(), ChannelError>;

    /// Replace the buttons of a sent message.
    async fn edit_buttons(
        &self,
        chat_id: &str,
        message_id: &str,
        rows: Vec<Vec<Button>>,
    ) -> Result<(), ChannelError>;

    /// Delete a sent message.
    async fn delete(&self, chat_id: &str, message_id: &str) -> Result<(), ChannelError>;

    /// Acknowledge a tap, optionally showing a short notice (`alert` makes it modal).
    async fn answer_tap(
        &self,
        callback_id: &str,
        notice: Option<&str>,
        alert: bool,
    ) -> Result<(), ChannelError>;

    /// Check the transport is reachable.
    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
