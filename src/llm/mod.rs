//! LLM integration for Gift Assist.
//!
//! A single OpenAI-compatible backend sits behind the `LlmProvider` trait so
//! the suggestion generator can be exercised with stub providers in tests.

pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: secrecy::SecretString,
    pub model: String,
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiProvider::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        config.timeout,
    )?;
    tracing::info!("Using OpenAI-compatible backend (model: {})", config.model);
    Ok(Arc::new(provider))
}
