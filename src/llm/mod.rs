//! LLM module - Language Model integrations
//!
//! Provides abstractions for different LLM backends with Gemini as the primary.

pub mod ollama;
pub mod provider;
pub mod traits;

pub use ollama::OllamaClient;
pub use provider::create_provider;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
