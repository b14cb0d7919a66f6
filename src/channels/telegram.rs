//! Telegram channel: long-polls the Bot API for messages and button taps.
//!
//! Talks to the Bot API directly over `reqwest`. Updates arrive through
//! `getUpdates`; callback queries become tap events.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::channels::{Button, Channel, EventStream, InboundEvent, Markup, OutgoingMessage};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;
/// Pause after a failed or rejected poll before asking again.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == username)
    }

    /// Check if any of the provided identities is allowed.
    pub fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        check_user_allowed(&self.allowed_users, identities)
    }

    /// Call a Bot API method and return its `result` field.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| ChannelError::Http(format!("{method}: {e}")))?;

        if !status.is_success() || data.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description");
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("{method} failed ({status}): {description}"),
            });
        }

        Ok(data.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Send a text message, splitting it at Telegram's 4096 char limit.
    /// Markup is attached to the last chunk; returns that chunk's message id.
    async fn send_message(&self, chat_id: &str, message: OutgoingMessage) -> Result<String, ChannelError> {
        let chunks = split_message(&message.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let markup = reply_markup(&message.markup);
        let mut last_id = String::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i + 1 == chunks.len()
                && let Some(ref markup) = markup
            {
                body["reply_markup"] = markup.clone();
            }

            let result = self.call("sendMessage", &body).await?;
            last_id = result
                .get("message_id")
                .and_then(Value::as_i64)
                .map(|id| id.to_string())
                .unwrap_or_default();
        }

        Ok(last_id)
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let url = format!("https://api.telegram.org/bot{}/getUpdates", bot_token);
                let body = json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let results = match poll_results(&data) {
                    Ok(results) => results,
                    Err(reason) => {
                        tracing::warn!("Telegram getUpdates rejected: {reason}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(parsed) = parse_update(update) else {
                        continue;
                    };

                    let identities = [parsed.username.as_str(), parsed.event.user_id.as_str()];
                    if !check_user_allowed(&allowed_users, identities) {
                        tracing::warn!(
                            "Telegram: ignoring update from unauthorized user: \
                             username={}, user_id={}",
                            parsed.username,
                            parsed.event.user_id
                        );
                        continue;
                    }

                    if tx.send(parsed.event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<String, ChannelError> {
        self.send_message(chat_id, message).await
    }

    async fn edit_text(&self, chat_id: &str, message_id: &str, text: &str) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": parse_message_id(message_id)?,
            "text": text,
        });
        self.call("editMessageText", &body).await.map(|_| ())
    }

    async fn edit_buttons(
        &self,
        chat_id: &str,
        message_id: &str,
        rows: Vec<Vec<Button>>,
    ) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": parse_message_id(message_id)?,
            "reply_markup": inline_keyboard(&rows),
        });
        self.call("editMessageReplyMarkup", &body).await.map(|_| ())
    }

    async fn delete(&self, chat_id: &str, message_id: &str) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": parse_message_id(message_id)?,
        });
        self.call("deleteMessage", &body).await.map(|_| ())
    }

    async fn answer_tap(
        &self,
        callback_id: &str,
        notice: Option<&str>,
        alert: bool,
    ) -> Result<(), ChannelError> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = notice {
            body["text"] = Value::String(text.to_string());
            body["show_alert"] = Value::Bool(alert);
        }
        self.call("answerCallbackQuery", &body).await.map(|_| ())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// An update turned into an event, plus the username used for the allowlist.
struct ParsedUpdate {
    username: String,
    event: InboundEvent,
}

/// Convert a raw update into an event. Non-text messages and other update
/// kinds are skipped.
/// The updates from a `getUpdates` reply, or why Telegram refused the poll
/// (bad token, another instance already polling, ...).
fn poll_results(data: &Value) -> Result<&[Value], String> {
    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        let code = data
            .get("error_code")
            .and_then(Value::as_i64)
            .map(|c| format!("{c} "))
            .unwrap_or_default();
        let description = data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description");
        return Err(format!("{code}{description}"));
    }
    data.get("result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| "reply has no result list".to_string())
}

fn parse_update(update: &Value) -> Option<ParsedUpdate> {
    if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        let from = message.get("from")?;
        let chat_id = message.get("chat")?.get("id").and_then(Value::as_i64)?;
        let (user_id, username, first_name) = sender(from)?;

        let event = InboundEvent::text("telegram", &user_id, &chat_id.to_string(), text)
            .with_user_name(first_name.unwrap_or_else(|| username.clone()));
        return Some(ParsedUpdate { username, event });
    }

    if let Some(query) = update.get("callback_query") {
        let callback_id = query.get("id").and_then(Value::as_str)?;
        let payload = query.get("data").and_then(Value::as_str)?;
        let (user_id, username, first_name) = sender(query.get("from")?)?;
        let message = query.get("message");
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string())
            .unwrap_or_else(|| user_id.clone());
        let message_id = message
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64)
            .map(|id| id.to_string());

        let mut event = InboundEvent::tap(
            "telegram",
            &user_id,
            &chat_id,
            callback_id,
            payload,
            message_id.as_deref(),
        );
        if let Some(name) = first_name {
            event = event.with_user_name(name);
        }
        return Some(ParsedUpdate { username, event });
    }

    None
}

/// Extract (numeric id, username, first name) from a `from` object.
fn sender(from: &Value) -> Option<(String, String, Option<String>)> {
    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let first_name = from
        .get("first_name")
        .and_then(Value::as_str)
        .map(String::from);
    Some((user_id, username, first_name))
}

fn parse_message_id(message_id: &str) -> Result<i64, ChannelError> {
    message_id
        .parse()
        .map_err(|_| ChannelError::InvalidMessage(format!("bad message id: {message_id}")))
}

fn inline_keyboard(rows: &[Vec<Button>]) -> Value {
    let rows: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.label, "callback_data": b.payload }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Bot API `reply_markup` for a message, if it has any.
fn reply_markup(markup: &Markup) -> Option<Value> {
    match markup {
        Markup::None => None,
        Markup::Buttons(rows) => Some(inline_keyboard(rows)),
        Markup::Choices(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            Some(json!({ "keyboard": rows, "resize_keyboard": true }))
        }
        Markup::ClearChoices => Some(json!({ "remove_keyboard": true })),
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Never cut inside a UTF-8 sequence
        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
