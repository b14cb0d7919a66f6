//! CLI channel: stdin/stdout REPL for local testing.
//!
//! Plain lines are text messages. `tap <payload>` presses a button on the
//! most recent message that carried buttons.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Button, Channel, EventStream, InboundEvent, Markup, OutgoingMessage};
use crate::error::ChannelError;

const USER_ID: &str = "local-user";

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    next_message_id: AtomicU64,
    /// Id of the last message shown with buttons; 0 when none.
    last_buttons: Arc<AtomicU64>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicU64::new(1),
            last_buttons: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one input line into an event. Blank lines yield nothing.
fn parse_line(line: &str, tap_seq: u64, last_buttons: u64) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(payload) = line.strip_prefix("tap ") {
        let message_id = (last_buttons != 0).then(|| last_buttons.to_string());
        return Some(InboundEvent::tap(
            "cli",
            USER_ID,
            USER_ID,
            &format!("cli-tap-{tap_seq}"),
            payload.trim(),
            message_id.as_deref(),
        ));
    }

    Some(InboundEvent::text("cli", USER_ID, USER_ID, line))
}

fn print_buttons(rows: &[Vec<Button>]) {
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|b| format!("[{}] (tap {})", b.label, b.payload))
            .collect();
        println!("  {}", cells.join("  "));
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let last_buttons = Arc::clone(&self.last_buttons);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();
            let mut tap_seq = 0u64;

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tap_seq += 1;
                        let Some(event) =
                            parse_line(&line, tap_seq, last_buttons.load(Ordering::SeqCst))
                        else {
                            eprint!("> ");
                            continue;
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, _chat_id: &str, message: OutgoingMessage) -> Result<String, ChannelError> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        println!("\n{}", message.text);
        match &message.markup {
            Markup::Buttons(rows) => {
                print_buttons(rows);
                self.last_buttons.store(id, Ordering::SeqCst);
            }
            Markup::Choices(rows) => {
                let labels: Vec<&str> = rows.iter().flatten().map(String::as_str).collect();
                println!("  choices: {}", labels.join(" | "));
            }
            Markup::None | Markup::ClearChoices => {}
        }
        println!();
        eprint!("> ");
        Ok(id.to_string())
    }

    async fn edit_text(&self, _chat_id: &str, message_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n(message {message_id} now reads)\n{text}\n");
        eprint!("> ");
        Ok(())
    }

    async fn edit_buttons(
        &self,
        _chat_id: &str,
        message_id: &str,
        rows: Vec<Vec<Button>>,
    ) -> Result<(), ChannelError> {
        println!("\n(message {message_id} buttons)");
        print_buttons(&rows);
        if let Ok(id) = message_id.parse() {
            self.last_buttons.store(id, Ordering::SeqCst);
        }
        eprint!("> ");
        Ok(())
    }

    async fn delete(&self, _chat_id: &str, message_id: &str) -> Result<(), ChannelError> {
        tracing::debug!(message_id, "CLI message removed");
        Ok(())
    }

    async fn answer_tap(
        &self,
        _callback_id: &str,
        notice: Option<&str>,
        alert: bool,
    ) -> Result<(), ChannelError> {
        match (notice, alert) {
            (Some(text), true) => eprintln!("⚠️  {text}"),
            (Some(text), false) => eprintln!("ℹ️  {text}"),
            (None, _) => {}
        }
        Ok(())
    }
}
