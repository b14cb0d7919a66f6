//! Conversation state machine: tracks which question the user is answering.

use serde::{Deserialize, Serialize};

use crate::gifts::ProfileDraft;

/// Phases of the guided flow.
///
/// Progresses linearly: Idle → AwaitingGender → AwaitingAge → AwaitingBudget →
/// AwaitingInterests → Idle. Only an explicit start request leaves `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Idle,
    AwaitingGender,
    AwaitingAge,
    AwaitingBudget,
    AwaitingInterests,
}

impl ConversationPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationPhase) -> bool {
        use ConversationPhase::*;
        matches!(
            (self, target),
            (Idle, AwaitingGender)
                | (AwaitingGender, AwaitingAge)
                | (AwaitingAge, AwaitingBudget)
                | (AwaitingBudget, AwaitingInterests)
                | (AwaitingInterests, Idle)
        )
    }

    /// Get the next phase reached by a valid answer.
    pub fn next(&self) -> Option<ConversationPhase> {
        use ConversationPhase::*;
        match self {
            Idle => None,
            AwaitingGender => Some(AwaitingAge),
            AwaitingAge => Some(AwaitingBudget),
            AwaitingBudget => Some(AwaitingInterests),
            AwaitingInterests => Some(Idle),
        }
    }
}

impl Default for ConversationPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingGender => "awaiting_gender",
            Self::AwaitingAge => "awaiting_age",
            Self::AwaitingBudget => "awaiting_budget",
            Self::AwaitingInterests => "awaiting_interests",
        };
        write!(f, "{s}")
    }
}

/// Everything the bot remembers about one user's conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationRecord {
    pub phase: ConversationPhase,
    pub draft: ProfileDraft,
    /// Last guided suggestion set, addressed by `save_<index>`.
    pub suggestions: Option<Vec<String>>,
    /// Last suggestion shown by the random flow.
    pub random_suggestion: Option<String>,
    /// Favorites as they were when the removal keyboard was shown.
    pub removal_listing: Option<Vec<String>>,
    /// Bumped by every reset; generation results from an older epoch are dropped.
    pub epoch: u64,
    /// Epoch of the generation currently outstanding, if any.
    pub in_flight: Option<u64>,
}

impl ConversationRecord {
    /// Move to `target` if the transition is valid.
    pub fn advance_to(&mut self, target: ConversationPhase) -> Result<(), String> {
        if !self.phase.can_transition_to(target) {
            return Err(format!("Cannot transition from {} to {}", self.phase, target));
        }
        self.phase = target;
        Ok(())
    }

    /// Start a fresh guided run: new epoch, empty draft, no suggestions.
    pub fn restart(&mut self, phase: ConversationPhase) {
        self.epoch += 1;
        self.phase = phase;
        self.draft = ProfileDraft::default();
        self.suggestions = None;
        self.random_suggestion = None;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use ConversationPhase::*;
        let transitions = [
            (Idle, AwaitingGender),
            (AwaitingGender, AwaitingAge),
            (AwaitingAge, AwaitingBudget),
            (AwaitingBudget, AwaitingInterests),
            (AwaitingInterests, Idle),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
            if from != Idle {
                assert_eq!(from.next(), Some(to));
            }
        }
    }

    #[test]
    fn invalid_transitions() {
        use ConversationPhase::*;
        assert!(!Idle.can_transition_to(AwaitingAge));
        assert!(!AwaitingGender.can_transition_to(AwaitingBudget));
        assert!(!AwaitingBudget.can_transition_to(AwaitingAge));
        assert!(!AwaitingAge.can_transition_to(AwaitingAge));
    }

    #[test]
    fn display_matches_serde() {
        use ConversationPhase::*;
        for phase in [Idle, AwaitingGender, AwaitingAge, AwaitingBudget, AwaitingInterests] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(format!("\"{phase}\""), json);
        }
    }

    #[test]
    fn restart_clears_run_data() {
        let mut record = ConversationRecord {
            phase: ConversationPhase::AwaitingBudget,
            suggestions: Some(vec!["A".into()]),
            random_suggestion: Some("R".into()),
            in_flight: Some(0),
            ..Default::default()
        };
        record.draft.age = Some(30);

        record.restart(ConversationPhase::AwaitingGender);
        assert_eq!(record.phase, ConversationPhase::AwaitingGender);
        assert_eq!(record.epoch, 1);
        assert_eq!(record.draft, ProfileDraft::default());
        assert!(record.suggestions.is_none());
        assert!(record.random_suggestion.is_none());
        assert!(record.in_flight.is_none());
    }

    #[test]
    fn advance_rejects_skips() {
        let mut record = ConversationRecord::default();
        assert!(record.advance_to(ConversationPhase::AwaitingAge).is_err());
        assert!(record.advance_to(ConversationPhase::AwaitingGender).is_ok());
    }
}
