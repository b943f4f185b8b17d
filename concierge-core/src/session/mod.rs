//! Session management for conversation history
//!
//! Sessions are bounded, in-memory conversation histories keyed by a
//! caller-supplied id. Storage sits behind the [`SessionStore`] trait so the
//! gateway can be handed any backend.

pub mod manager;
pub mod store;

pub use manager::{InMemorySessionStore, SessionStore};
pub use store::{HistoryEntry, Role, Session};

/// Session id used when the caller does not supply one
pub const DEFAULT_SESSION_ID: &str = "default";
