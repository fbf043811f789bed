//! LLM Provider implementations and factory
//!
//! Submodules implement hosted providers; the local Ollama client lives in
//! `crate::llm::ollama`.

pub mod gemini;

use std::sync::Arc;

use crate::core::config::{Config, ProviderType};
use crate::core::Result;
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

use self::gemini::GeminiProvider;

/// Create a new LLM provider based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.llm.provider {
        ProviderType::Gemini => {
            if config.llm.api_key.is_none() {
                log::warn!("GOOGLE_API_KEY not set. Model calls will fail until it is configured.");
            }
            Arc::new(GeminiProvider::from_config(config)?)
        }
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    log::info!("Using LLM model: {} ({})", config.llm.model, provider.name());
    Ok(provider)
}
