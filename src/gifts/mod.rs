//! Gift domain: recipient profiles and the suggestion generator.

pub mod generator;
pub mod profile;
pub mod prompts;

pub use generator::{GeneratorConfig, LlmSuggestionGenerator, SuggestionGenerator};
pub use profile::{Gender, GiftProfile, ProfileDraft, parse_age, parse_budget};
