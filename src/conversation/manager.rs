//! ConversationManager: drives the guided flow, the random flow, and the
//! generation-epoch guard around suggestion generation.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::gifts::{Gender, GiftProfile, SuggestionGenerator, parse_age, parse_budget};

use super::state::{ConversationPhase, ConversationRecord};
use super::store::ConversationStore;

/// Result of feeding one text message into the guided flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// No guided flow is running; the text was not consumed.
    NotCollecting,
    /// The answer was accepted; prompt for the returned phase.
    Advanced(ConversationPhase),
    /// The answer was malformed; re-prompt for the unchanged phase.
    Invalid(ConversationPhase),
    /// The answer was meant for a phase the conversation is no longer in.
    Stale {
        expected: ConversationPhase,
        actual: ConversationPhase,
    },
    /// A generation for this user is still outstanding.
    Busy,
    /// The profile is complete; run the ticket through [`ConversationManager::generate`].
    Generate(GenerationTicket),
}

/// Which flow launched a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Guided,
    Random,
}

/// A generation launched from a specific conversation epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub user_id: String,
    pub epoch: u64,
    pub kind: GenerationKind,
    pub profile: GiftProfile,
}

/// What became of a generation once the generator returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Guided flow: the stored suggestion set, in display order.
    Suggestions(Vec<String>),
    /// Random flow: the one suggestion picked from the candidates.
    Random(String),
    /// The generator returned nothing.
    Failed,
    /// The conversation was reset while the call was outstanding.
    Discarded,
}

/// Coordinates per-user conversation records and the suggestion generator.
pub struct ConversationManager {
    store: ConversationStore,
    generator: Arc<dyn SuggestionGenerator>,
}

impl ConversationManager {
    pub fn new(generator: Arc<dyn SuggestionGenerator>) -> Self {
        Self {
            store: ConversationStore::new(),
            generator,
        }
    }

    /// Current phase for `user_id`.
    pub async fn phase(&self, user_id: &str) -> ConversationPhase {
        self.store.lock(user_id).await.phase
    }

    /// Begin the guided flow, discarding any partial profile and any
    /// outstanding generation result.
    pub async fn start_guided(&self, user_id: &str) {
        let mut record = self.store.lock(user_id).await;
        record.restart(ConversationPhase::AwaitingGender);
        info!(user_id, epoch = record.epoch, "Guided flow started");
    }

    /// Abandon whatever is in progress and return to idle.
    pub async fn reset(&self, user_id: &str) {
        let mut record = self.store.lock(user_id).await;
        record.restart(ConversationPhase::Idle);
        debug!(user_id, epoch = record.epoch, "Conversation reset");
    }

    /// Feed a text message into the guided flow.
    pub async fn answer(&self, user_id: &str, text: &str) -> AnswerOutcome {
        let mut record = self.store.lock(user_id).await;
        apply_answer(&mut record, user_id, text)
    }

    /// Feed an answer that was given to the prompt for `expected`.
    ///
    /// If the conversation has moved on (or back) since that prompt, the
    /// answer is rejected instead of being applied to the current phase.
    pub async fn answer_for(
        &self,
        user_id: &str,
        expected: ConversationPhase,
        text: &str,
    ) -> AnswerOutcome {
        let mut record = self.store.lock(user_id).await;
        if record.phase != expected {
            debug!(user_id, %expected, actual = %record.phase, "Stale answer rejected");
            return AnswerOutcome::Stale {
                expected,
                actual: record.phase,
            };
        }
        apply_answer(&mut record, user_id, text)
    }

    /// Reserve a random-flow generation for `profile`. Returns `None` while
    /// another generation for this user is outstanding.
    pub async fn begin_random(&self, user_id: &str, profile: GiftProfile) -> Option<GenerationTicket> {
        let mut record = self.store.lock(user_id).await;
        if record.in_flight.is_some() {
            return None;
        }
        record.in_flight = Some(record.epoch);
        Some(GenerationTicket {
            user_id: user_id.to_string(),
            epoch: record.epoch,
            kind: GenerationKind::Random,
            profile,
        })
    }

    /// Call the generator for `ticket` and apply the result, unless the
    /// conversation was reset while the call was outstanding.
    pub async fn generate(&self, ticket: GenerationTicket) -> GenerationOutcome {
        info!(
            user_id = %ticket.user_id,
            epoch = ticket.epoch,
            kind = ?ticket.kind,
            "Generating gift ideas"
        );
        let ideas = self.generator.generate(&ticket.profile).await;

        let mut record = self.store.lock(&ticket.user_id).await;
        if record.epoch != ticket.epoch {
            info!(
                user_id = %ticket.user_id,
                launched = ticket.epoch,
                current = record.epoch,
                "Discarding generation result from an earlier conversation"
            );
            return GenerationOutcome::Discarded;
        }
        record.in_flight = None;

        if ideas.is_empty() {
            warn!(user_id = %ticket.user_id, "Generation returned no suggestions");
            return GenerationOutcome::Failed;
        }

        match ticket.kind {
            GenerationKind::Guided => {
                record.suggestions = Some(ideas.clone());
                GenerationOutcome::Suggestions(ideas)
            }
            GenerationKind::Random => {
                let Some(pick) = ideas.choose(&mut rand::thread_rng()).cloned() else {
                    return GenerationOutcome::Failed;
                };
                record.random_suggestion = Some(pick.clone());
                GenerationOutcome::Random(pick)
            }
        }
    }

    /// Suggestion `index` of the last guided set.
    pub async fn suggestion(&self, user_id: &str, index: usize) -> Option<String> {
        let record = self.store.lock(user_id).await;
        record.suggestions.as_ref()?.get(index).cloned()
    }

    /// The last suggestion shown by the random flow.
    pub async fn random_suggestion(&self, user_id: &str) -> Option<String> {
        self.store.lock(user_id).await.random_suggestion.clone()
    }

    /// Remember the favorites listing shown with removal buttons.
    pub async fn remember_removal_listing(&self, user_id: &str, listing: Vec<String>) {
        self.store.lock(user_id).await.removal_listing = Some(listing);
    }

    /// Item `index` of the remembered removal listing.
    pub async fn removal_listing_item(&self, user_id: &str, index: usize) -> Option<String> {
        let record = self.store.lock(user_id).await;
        record.removal_listing.as_ref()?.get(index).cloned()
    }
}

fn apply_answer(record: &mut ConversationRecord, user_id: &str, text: &str) -> AnswerOutcome {
    if record.in_flight.is_some() {
        return AnswerOutcome::Busy;
    }

    let phase = record.phase;
    let accepted = match phase {
        ConversationPhase::Idle => return AnswerOutcome::NotCollecting,
        ConversationPhase::AwaitingGender => Gender::from_input(text)
            .map(|gender| record.draft.gender = Some(gender))
            .is_some(),
        ConversationPhase::AwaitingAge => parse_age(text)
            .map(|age| record.draft.age = Some(age))
            .is_some(),
        ConversationPhase::AwaitingBudget => parse_budget(text)
            .map(|budget| record.draft.budget = Some(budget))
            .is_some(),
        ConversationPhase::AwaitingInterests => {
            if text.trim().is_empty() {
                false
            } else {
                return issue_guided_ticket(record, user_id, text);
            }
        }
    };

    if !accepted {
        debug!(user_id, %phase, "Invalid answer, re-prompting");
        return AnswerOutcome::Invalid(phase);
    }

    let Some(next) = phase.next() else {
        return AnswerOutcome::Invalid(phase);
    };
    if let Err(e) = record.advance_to(next) {
        warn!(user_id, "Failed to advance conversation: {}", e);
        return AnswerOutcome::Invalid(phase);
    }
    debug!(user_id, from = %phase, to = %next, "Answer accepted");
    AnswerOutcome::Advanced(next)
}

/// Finish the guided flow: the profile leaves the record, the record returns
/// to idle and the generation is marked outstanding.
fn issue_guided_ticket(record: &mut ConversationRecord, user_id: &str, interests: &str) -> AnswerOutcome {
    let Some(profile) = record.draft.complete(interests) else {
        warn!(user_id, "Interests received with an incomplete profile, restarting");
        record.restart(ConversationPhase::Idle);
        return AnswerOutcome::NotCollecting;
    };

    record.draft = Default::default();
    record.phase = ConversationPhase::Idle;
    record.in_flight = Some(record.epoch);
    info!(user_id, epoch = record.epoch, "Guided profile complete");

    AnswerOutcome::Generate(GenerationTicket {
        user_id: user_id.to_string(),
        epoch: record.epoch,
        kind: GenerationKind::Guided,
        profile,
    })
}
