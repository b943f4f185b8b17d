//! Context builder for assembling provider requests

use concierge_core::session::HistoryEntry;
use concierge_providers::{GenerationRequest, Message};

/// Property identifier reported by the health endpoint
pub const HOTEL_NAME: &str = "Seattle Marriott Bellevue";

/// Persona, property facts, dining menu, complaint script and formatting rules
const HOTEL_INSTRUCTIONS: &str = include_str!("../prompts/hotel.md");

/// Builds the request sent to the provider for each chat turn
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    instructions: String,
}

impl ContextBuilder {
    /// Create a context builder with the embedded hotel instructions
    pub fn new() -> Self {
        Self::with_instructions(HOTEL_INSTRUCTIONS)
    }

    /// Create a context builder with custom instruction text
    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into().trim_end().to_string(),
        }
    }

    /// The fixed instruction text
    pub fn system_instruction(&self) -> &str {
        &self.instructions
    }

    /// Build the provider request from prior turns and the new message.
    ///
    /// `prior` must not contain the entry for `current_message`.
    pub fn build_request(
        &self,
        prior: &[HistoryEntry],
        current_message: impl Into<String>,
    ) -> GenerationRequest {
        GenerationRequest {
            system_instruction: self.instructions.clone(),
            history: prior.iter().map(Message::from).collect(),
            message: current_message.into(),
            model: None,
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
