//! Session store trait.
//!
//! Defines the durable slot that holds the current session id.

use super::model::SessionInfo;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A durable slot holding the id of the current session.
///
/// The store is a pure accessor: it does not know whether the server still
/// recognizes the id it holds. It must be usable before any network activity
/// and report `has_session = false` on first run.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads the slot.
    async fn get(&self) -> SessionInfo;

    /// Replaces the slot with the given session id.
    async fn set(&self, session_id: &str) -> Result<()>;

    /// Empties the slot.
    async fn clear(&self) -> Result<()>;
}

/// Process-local store, used by tests and by the REPL's `--ephemeral` mode.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session_id: Mutex<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a session id.
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Mutex::new(Some(session_id.into())),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self) -> SessionInfo {
        SessionInfo::from_optional(self.session_id.lock().await.clone())
    }

    async fn set(&self, session_id: &str) -> Result<()> {
        *self.session_id.lock().await = Some(session_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session_id.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_has_no_session() {
        let store = InMemorySessionStore::new();
        let info = store.get().await;
        assert!(!info.has_session);
        assert_eq!(info.session_id, None);
    }

    #[tokio::test]
    async fn test_set_then_clear() {
        let store = InMemorySessionStore::new();
        store.set("abc").await.unwrap();
        assert_eq!(store.get().await, SessionInfo::with_id("abc"));

        store.set("def").await.unwrap();
        assert_eq!(store.get().await.session_id(), Some("def"));

        store.clear().await.unwrap();
        assert!(!store.get().await.has_session);
    }
}
