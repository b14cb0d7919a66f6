//! GiftBot: routes inbound events to the conversation manager and the
//! selection coordinator, and renders the replies.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, InboundEvent, InboundKind, Markup, OutgoingMessage};
use crate::config::Shop;
use crate::conversation::{
    AnswerOutcome, ConversationManager, GenerationKind, GenerationOutcome, GenerationTicket,
};
use crate::error::Error;
use crate::favorites::FavoritesStore;
use crate::gifts::{GiftProfile, SuggestionGenerator};

use super::coordinator::{RemoveOutcome, SaveOutcome, SaveTarget, SelectionCoordinator};
use super::messages;
use super::payload::CallbackAction;

/// Slash commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Gift,
    Random,
    Favorites,
}

impl Command {
    /// Parse `/name` or `/name@botname`, ignoring anything after the first word.
    fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "gift" => Some(Self::Gift),
            "random" => Some(Self::Random),
            "favorites" => Some(Self::Favorites),
            _ => None,
        }
    }
}

/// A generation whose ticket has been issued and whose working indicator is
/// already on screen.
struct PendingGeneration {
    chat_id: String,
    ticket: GenerationTicket,
    working: Option<String>,
}

/// Per-user inboxes feeding the user workers.
type UserQueues = HashMap<String, mpsc::UnboundedSender<InboundEvent>>;

/// The gift assistant bot.
pub struct GiftBot {
    conversations: Arc<ConversationManager>,
    selection: SelectionCoordinator,
    shops: Vec<Shop>,
}

impl GiftBot {
    pub fn new(
        generator: Arc<dyn SuggestionGenerator>,
        favorites: Arc<FavoritesStore>,
        shops: Vec<Shop>,
    ) -> Self {
        let conversations = Arc::new(ConversationManager::new(generator));
        let selection = SelectionCoordinator::new(Arc::clone(&conversations), favorites);
        Self {
            conversations,
            selection,
            shops,
        }
    }

    /// Run until the channel's stream ends or Ctrl+C.
    ///
    /// Each user gets one worker that applies their events strictly in
    /// arrival order; different users are served concurrently. Generations
    /// run beside the worker, so the user's next message is answered with
    /// "busy" (or a reset) instead of waiting behind the model. On exit the
    /// queued events and in-flight generations are finished before the
    /// channel shuts down.
    pub async fn run(self: Arc<Self>, channel: Arc<dyn Channel>) -> Result<(), Error> {
        let mut events = channel.start().await?;
        info!(channel = channel.name(), "Gift bot ready and listening");

        let mut queues = UserQueues::new();
        let mut workers = JoinSet::new();

        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => match event {
                    Some(event) => event,
                    None => {
                        info!("Channel stream ended, shutting down...");
                        break;
                    }
                },
            };

            Self::enqueue(&self, &channel, &mut queues, &mut workers, event);
        }

        drop(queues);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("User worker failed: {}", e);
            }
        }

        channel.shutdown().await?;
        Ok(())
    }

    /// Hand the event to its user's worker, starting one if needed.
    fn enqueue(
        bot: &Arc<Self>,
        channel: &Arc<dyn Channel>,
        queues: &mut UserQueues,
        workers: &mut JoinSet<()>,
        event: InboundEvent,
    ) {
        let event = match queues.get(&event.user_id) {
            Some(queue) => match queue.send(event) {
                Ok(()) => return,
                // The worker is gone (it panicked); start a fresh one.
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (queue, inbox) = mpsc::unbounded_channel();
        debug!(user_id = %event.user_id, "Starting user worker");
        queues.insert(event.user_id.clone(), queue);
        workers.spawn(Arc::clone(bot).serve_user(Arc::clone(channel), event, inbox));
    }

    /// Apply one user's events in order until their inbox closes.
    async fn serve_user(
        self: Arc<Self>,
        channel: Arc<dyn Channel>,
        first: InboundEvent,
        mut inbox: mpsc::UnboundedReceiver<InboundEvent>,
    ) {
        let mut generations = JoinSet::new();
        let mut next = Some(first);

        loop {
            let event = match next.take() {
                Some(event) => event,
                None => match inbox.recv().await {
                    Some(event) => event,
                    None => break,
                },
            };
            if let Some(pending) = self.process(channel.as_ref(), &event).await {
                let bot = Arc::clone(&self);
                let channel = Arc::clone(&channel);
                generations.spawn(async move {
                    bot.finish_generation(channel.as_ref(), pending).await;
                });
            }
            while generations.try_join_next().is_some() {}
        }

        while generations.join_next().await.is_some() {}
    }

    /// Handle one event to completion, including any generation it starts.
    /// Failures are logged and reported to the user; they never propagate.
    pub async fn handle(&self, channel: &dyn Channel, event: InboundEvent) {
        if let Some(pending) = self.process(channel, &event).await {
            self.finish_generation(channel, pending).await;
        }
    }

    /// Apply the event to the conversation state and send the immediate
    /// replies. Returns the generation the event started, if any.
    async fn process(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
    ) -> Option<PendingGeneration> {
        let result = match &event.kind {
            InboundKind::Text(text) => self.handle_text(channel, event, text).await,
            InboundKind::Tap {
                callback_id,
                payload,
                message_id,
            } => self
                .handle_tap(channel, event, callback_id, payload, message_id.as_deref())
                .await
                .map(|()| None),
        };

        match result {
            Ok(pending) => pending,
            Err(e) => {
                error!(user_id = %event.user_id, channel = %event.channel, "Error handling event: {}", e);
                let notified = match &event.kind {
                    InboundKind::Tap { callback_id, .. } => channel
                        .answer_tap(callback_id, Some(messages::FAILURE), true)
                        .await,
                    InboundKind::Text(_) => channel
                        .send(&event.chat_id, OutgoingMessage::text(messages::FAILURE))
                        .await
                        .map(|_| ()),
                };
                if let Err(e) = notified {
                    warn!(user_id = %event.user_id, "Failed to send failure notice: {}", e);
                }
                None
            }
        }
    }

    // ── Text ────────────────────────────────────────────────────────

    async fn handle_text(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
        text: &str,
    ) -> Result<Option<PendingGeneration>, Error> {
        if let Some(command) = Command::parse(text) {
            return self.handle_command(channel, event, command).await;
        }

        let user_id = event.user_id.as_str();
        let chat_id = event.chat_id.as_str();
        match self.conversations.answer(user_id, text).await {
            AnswerOutcome::NotCollecting => {
                if messages::mentions_buying(text) {
                    channel.send(chat_id, messages::shops(&self.shops)).await?;
                } else {
                    debug!(user_id, "Ignoring text outside the guided flow");
                }
            }
            AnswerOutcome::Advanced(phase) => {
                if let Some(prompt) = messages::prompt_for(phase) {
                    channel.send(chat_id, prompt).await?;
                }
            }
            AnswerOutcome::Invalid(phase) => {
                if let Some(prompt) = messages::reprompt_for(phase) {
                    channel.send(chat_id, prompt).await?;
                }
            }
            AnswerOutcome::Stale { expected, actual } => {
                debug!(user_id, %expected, %actual, "Dropping stale answer");
            }
            AnswerOutcome::Busy => {
                channel.send(chat_id, OutgoingMessage::text(messages::BUSY)).await?;
            }
            AnswerOutcome::Generate(ticket) => {
                return Ok(Some(self.start_generation(channel, chat_id, ticket).await));
            }
        }
        Ok(None)
    }

    async fn handle_command(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
        command: Command,
    ) -> Result<Option<PendingGeneration>, Error> {
        let user_id = event.user_id.as_str();
        let chat_id = event.chat_id.as_str();
        debug!(user_id, ?command, "Command received");

        match command {
            Command::Start => {
                self.conversations.reset(user_id).await;
                channel
                    .send(chat_id, messages::welcome(event.user_name.as_deref()))
                    .await?;
            }
            Command::Help => {
                channel
                    .send(chat_id, messages::welcome(event.user_name.as_deref()))
                    .await?;
            }
            Command::Gift => {
                self.conversations.start_guided(user_id).await;
                channel.send(chat_id, messages::gender_prompt()).await?;
            }
            Command::Random => {
                let profile = GiftProfile::random(&mut rand::thread_rng());
                match self.conversations.begin_random(user_id, profile).await {
                    Some(ticket) => {
                        return Ok(Some(self.start_generation(channel, chat_id, ticket).await));
                    }
                    None => {
                        channel.send(chat_id, OutgoingMessage::text(messages::BUSY)).await?;
                    }
                }
            }
            Command::Favorites => {
                let items = self.selection.favorites(user_id).await;
                channel.send(chat_id, messages::favorites(&items)).await?;
            }
        }
        Ok(None)
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Show the working indicator for a freshly issued ticket. Never fails,
    /// so every ticket reaches `finish_generation` and its in-flight mark is
    /// released.
    async fn start_generation(
        &self,
        channel: &dyn Channel,
        chat_id: &str,
        ticket: GenerationTicket,
    ) -> PendingGeneration {
        let working_text = match ticket.kind {
            GenerationKind::Guided => messages::WORKING_GUIDED,
            GenerationKind::Random => messages::WORKING_RANDOM,
        };
        let working = match channel.send(chat_id, OutgoingMessage::text(working_text)).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(chat_id, "Failed to send working indicator: {}", e);
                None
            }
        };
        PendingGeneration {
            chat_id: chat_id.to_string(),
            ticket,
            working,
        }
    }

    /// Run the generation, remove the indicator and present the outcome.
    async fn finish_generation(&self, channel: &dyn Channel, pending: PendingGeneration) {
        let PendingGeneration {
            chat_id,
            ticket,
            working,
        } = pending;
        let user_id = ticket.user_id.clone();
        let kind = ticket.kind;

        let outcome = self.conversations.generate(ticket).await;

        if let Some(id) = working
            && let Err(e) = channel.delete(&chat_id, &id).await
        {
            warn!(chat_id = %chat_id, message_id = %id, "Failed to remove working indicator: {}", e);
        }

        let reply = match outcome {
            GenerationOutcome::Suggestions(ideas) => messages::suggestions(&ideas),
            GenerationOutcome::Random(idea) => messages::random_suggestion(&idea),
            GenerationOutcome::Failed => OutgoingMessage::text(match kind {
                GenerationKind::Guided => messages::GUIDED_FAILED,
                GenerationKind::Random => messages::RANDOM_FAILED,
            }),
            GenerationOutcome::Discarded => return,
        };
        if let Err(e) = channel.send(&chat_id, reply).await {
            error!(user_id = %user_id, "Failed to deliver generation result: {}", e);
            if let Err(e) = channel
                .send(&chat_id, OutgoingMessage::text(messages::FAILURE))
                .await
            {
                warn!(user_id = %user_id, "Failed to send failure notice: {}", e);
            }
        }
    }

    // ── Taps ────────────────────────────────────────────────────────

    async fn handle_tap(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
        callback_id: &str,
        payload: &str,
        message_id: Option<&str>,
    ) -> Result<(), Error> {
        let user_id = event.user_id.as_str();
        let Some(action) = CallbackAction::parse(payload) else {
            warn!(user_id, payload, "Malformed button payload");
            channel
                .answer_tap(callback_id, Some(messages::NOT_FOUND), true)
                .await?;
            return Ok(());
        };

        match action {
            CallbackAction::Save(index) => {
                self.save(channel, user_id, callback_id, SaveTarget::Suggestion(index))
                    .await
            }
            CallbackAction::SaveRandom => {
                self.save(channel, user_id, callback_id, SaveTarget::Random)
                    .await
            }
            CallbackAction::ListRemovals => {
                let listing = self.selection.begin_removal(user_id).await;
                if listing.is_empty() {
                    channel
                        .answer_tap(callback_id, Some(messages::NOTHING_TO_REMOVE), true)
                        .await?;
                    return Ok(());
                }
                let rows = messages::removal_buttons(listing.len());
                match message_id {
                    Some(id) => channel.edit_buttons(&event.chat_id, id, rows).await?,
                    None => {
                        let message = messages::favorites(&listing).with_markup(Markup::Buttons(rows));
                        channel.send(&event.chat_id, message).await?;
                    }
                }
                channel.answer_tap(callback_id, None, false).await?;
                Ok(())
            }
            CallbackAction::Remove(index) => match self.selection.remove(user_id, index).await? {
                RemoveOutcome::Removed(_) => {
                    match message_id {
                        Some(id) => channel.edit_text(&event.chat_id, id, messages::REMOVED).await?,
                        None => {
                            channel
                                .send(&event.chat_id, OutgoingMessage::text(messages::REMOVED))
                                .await?;
                        }
                    }
                    channel.answer_tap(callback_id, None, false).await?;
                    Ok(())
                }
                RemoveOutcome::NotFound => {
                    channel
                        .answer_tap(callback_id, Some(messages::REMOVE_FAILED), true)
                        .await?;
                    Ok(())
                }
            },
        }
    }

    async fn save(
        &self,
        channel: &dyn Channel,
        user_id: &str,
        callback_id: &str,
        target: SaveTarget,
    ) -> Result<(), Error> {
        let (notice, alert) = match self.selection.save(user_id, target).await? {
            SaveOutcome::Saved(_) => (messages::SAVED, false),
            SaveOutcome::AlreadyPresent(_) => (messages::ALREADY_SAVED, false),
            SaveOutcome::NotFound => (messages::NOT_FOUND, true),
        };
        channel.answer_tap(callback_id, Some(notice), alert).await?;
        Ok(())
    }
}
