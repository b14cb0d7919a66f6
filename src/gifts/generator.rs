//! Suggestion generator: turns a profile into gift ideas via an LLM.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::profile::GiftProfile;
use super::prompts::{SYSTEM_PROMPT, gift_prompt, parse_suggestions};

/// Produces gift suggestions for a profile.
///
/// Implementations never fail: provider errors are logged and reported as an
/// empty result, which callers treat as a generation failure.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    /// Return up to five suggestions, or an empty vector on failure.
    async fn generate(&self, profile: &GiftProfile) -> Vec<String>;
}

/// Configuration for gift generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum number of suggestions per call.
    pub max_suggestions: usize,
    /// LLM temperature.
    pub temperature: f32,
    /// Max tokens for the LLM response.
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 5,
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// `SuggestionGenerator` backed by an `LlmProvider`. One attempt per call.
pub struct LlmSuggestionGenerator {
    llm: Arc<dyn LlmProvider>,
    config: GeneratorConfig,
}

impl LlmSuggestionGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl SuggestionGenerator for LlmSuggestionGenerator {
    async fn generate(&self, profile: &GiftProfile) -> Vec<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(gift_prompt(profile, self.config.max_suggestions)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        match self.llm.complete(request).await {
            Ok(response) => {
                let ideas = parse_suggestions(&response.content, self.config.max_suggestions);
                info!(
                    count = ideas.len(),
                    model = self.llm.model_name(),
                    output_tokens = response.output_tokens,
                    "Generated gift suggestions"
                );
                ideas
            }
            Err(e) => {
                warn!(error = %e, "Gift generation failed");
                Vec::new()
            }
        }
    }
}
