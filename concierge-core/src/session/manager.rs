//! Session store abstraction and the in-memory backend

use super::store::{HistoryEntry, Session};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage for per-session conversation history.
///
/// Each operation is atomic on its own; sequences of operations on the same
/// session are serialized by the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Entries of a session in chronological order, empty if absent
    async fn history(&self, key: &str) -> crate::Result<Vec<HistoryEntry>>;

    /// Number of entries in a session, zero if absent
    async fn len(&self, key: &str) -> crate::Result<usize>;

    /// Whether a session exists
    async fn contains(&self, key: &str) -> crate::Result<bool>;

    /// Append an entry, creating the session if needed. Returns the new length.
    async fn append(&self, key: &str, entry: HistoryEntry) -> crate::Result<usize>;

    /// Keep only the newest `max_entries` entries. Returns the new length.
    async fn truncate(&self, key: &str, max_entries: usize) -> crate::Result<usize>;

    /// Remove and return the newest entry
    async fn pop(&self, key: &str) -> crate::Result<Option<HistoryEntry>>;

    /// Remove a session. Returns whether it existed.
    async fn delete(&self, key: &str) -> crate::Result<bool>;

    /// Number of live sessions
    async fn session_count(&self) -> crate::Result<usize>;
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, key: &str) -> crate::Result<Vec<HistoryEntry>> {
        Ok(self
            .sessions
            .read()
            .get(key)
            .map(|s| s.messages.clone())
            .unwrap_or_default())
    }

    async fn len(&self, key: &str) -> crate::Result<usize> {
        Ok(self.sessions.read().get(key).map_or(0, Session::len))
    }

    async fn contains(&self, key: &str) -> crate::Result<bool> {
        Ok(self.sessions.read().contains_key(key))
    }

    async fn append(&self, key: &str, entry: HistoryEntry) -> crate::Result<usize> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %key, "Creating session");
                Session::new(key)
            });
        session.push(entry);
        Ok(session.len())
    }

    async fn truncate(&self, key: &str, max_entries: usize) -> crate::Result<usize> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(key) {
            Some(session) => {
                let dropped = session.truncate_front(max_entries);
                if dropped > 0 {
                    tracing::debug!(session_id = %key, dropped, "Trimmed session history");
                }
                Ok(session.len())
            }
            None => Ok(0),
        }
    }

    async fn pop(&self, key: &str) -> crate::Result<Option<HistoryEntry>> {
        Ok(self
            .sessions
            .write()
            .get_mut(key)
            .and_then(|s| s.messages.pop()))
    }

    async fn delete(&self, key: &str) -> crate::Result<bool> {
        Ok(self.sessions.write().remove(key).is_some())
    }

    async fn session_count(&self) -> crate::Result<usize> {
        Ok(self.sessions.read().len())
    }
}
