//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    /// Literal text of the turn
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create a new entry stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user entry
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a model entry
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Caller-supplied session id
    pub key: String,
    /// Entries in chronological order
    pub messages: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session
    pub fn new(key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append an entry to the session
    pub fn push(&mut self, entry: HistoryEntry) {
        self.messages.push(entry);
        self.updated_at = Utc::now();
    }

    /// Drop the oldest entries so at most `max_entries` remain.
    ///
    /// Returns the number of entries dropped.
    pub fn truncate_front(&mut self, max_entries: usize) -> usize {
        let excess = self.messages.len().saturating_sub(max_entries);
        if excess > 0 {
            self.messages.drain(..excess);
            self.updated_at = Utc::now();
        }
        excess
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("guest-42");
        assert_eq!(session.key, "guest-42");
        assert!(session.is_empty());
    }

    #[test]
    fn test_push_keeps_order() {
        let mut session = Session::new("test");
        session.push(HistoryEntry::user("Hello"));
        session.push(HistoryEntry::model("Hi there!"));

        assert_eq!(session.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[1].role, Role::Model);
    }

    #[test]
    fn test_truncate_front_drops_oldest() {
        let mut session = Session::new("test");
        for i in 0..25 {
            session.push(HistoryEntry::user(format!("Message {}", i)));
        }

        assert_eq!(session.truncate_front(20), 5);
        assert_eq!(session.len(), 20);
        assert_eq!(session.messages[0].content, "Message 5");
        assert_eq!(session.messages[19].content, "Message 24");

        assert_eq!(session.truncate_front(20), 0);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let entry = HistoryEntry::model("ok");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(Role::User.to_string(), "user");
    }
}
