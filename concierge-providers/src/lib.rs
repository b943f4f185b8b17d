//! Text-generation provider integrations for the concierge gateway
//!
//! This crate provides the provider abstraction and the Gemini client.

pub mod base;
pub mod gemini;

pub use base::{
    GenerationRequest, LLMProvider, LLMResponse, Message, ProviderError, ProviderResult,
};
pub use gemini::GeminiClient;

use concierge_core::config::ProviderConfig;
use std::sync::Arc;

/// Build the configured provider, or `None` when no API key is set
pub fn provider_from_config(config: &ProviderConfig) -> Option<Arc<dyn LLMProvider>> {
    if !config.has_api_key() {
        return None;
    }

    let client = GeminiClient::new(
        config.api_key.trim(),
        config.api_base.clone(),
        config.model.clone(),
    )
    .with_generation_config(config.temperature, config.max_output_tokens);

    Some(Arc::new(client))
}
