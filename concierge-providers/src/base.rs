//! Base trait for generation providers

use async_trait::async_trait;
use concierge_core::session::{HistoryEntry, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for concierge_core::Error {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::ConfigError(msg) => concierge_core::Error::Config(msg),
            other => concierge_core::Error::Provider(other.to_string()),
        }
    }
}

/// One prior turn sent to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a model message
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

impl From<&HistoryEntry> for Message {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            role: entry.role,
            content: entry.content.clone(),
        }
    }
}

/// Everything the provider needs to produce the next model turn
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fixed instruction text sent with every request
    pub system_instruction: String,
    /// Prior turns, oldest first, excluding `message`
    pub history: Vec<Message>,
    /// The new user text to answer
    pub message: String,
    /// Overrides the provider's default model
    pub model: Option<String>,
}

/// Response from a generation provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: HashMap<String, i64>,
}

fn default_finish_reason() -> String {
    "STOP".to_string()
}

/// Trait for text-generation providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate the next model turn for a conversation
    async fn generate(&self, request: GenerationRequest) -> ProviderResult<LLMResponse>;

    /// Get the default model for this provider
    fn get_default_model(&self) -> String;
}
