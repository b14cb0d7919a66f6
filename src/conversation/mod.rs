//! Conversation system: per-user guided dialogue that collects a gift
//! profile one answer at a time.
//!
//! Each user has one record (phase, partial profile, last suggestions) in a
//! keyed store. Transitions happen under that user's lock; the suggestion
//! generator is called outside it and its result is only applied if the
//! conversation epoch that launched it is still current.

pub mod manager;
pub mod state;
pub mod store;

pub use manager::{
    AnswerOutcome, ConversationManager, GenerationKind, GenerationOutcome, GenerationTicket,
};
pub use state::{ConversationPhase, ConversationRecord};
pub use store::ConversationStore;
