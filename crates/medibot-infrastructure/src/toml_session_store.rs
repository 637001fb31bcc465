//! TOML-backed session store.
//!
//! Persists the current session id in `session.toml`:
//!
//! ```toml
//! session_id = "0f8fad5b-d9cb-469f-a165-70867728950e"
//! ```

use crate::paths::{MedibotPaths, ServiceType};
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use medibot_core::error::{MedibotError, Result};
use medibot_core::session::{SessionInfo, SessionStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// On-disk layout of the session slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SessionSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

/// Session store persisted to a TOML file.
///
/// The slot is read once at construction and cached; the cache only changes
/// once the file write has succeeded. An unreadable file is treated as an
/// empty slot so that a corrupt file degrades into a fresh conversation
/// instead of an error.
#[derive(Clone)]
pub struct TomlSessionStore {
    cached: Arc<Mutex<Option<String>>>,
    file: Arc<AtomicTomlFile<SessionSlot>>,
}

impl TomlSessionStore {
    /// Opens the store at the default location (`<config_dir>/medibot/session.toml`).
    pub async fn new() -> Result<Self> {
        let path = MedibotPaths::default().get_path(ServiceType::Session)?;
        Self::with_path(path).await
    }

    /// Opens the store at an explicit path.
    pub async fn with_path(path: PathBuf) -> Result<Self> {
        let file = Arc::new(AtomicTomlFile::<SessionSlot>::new(path));

        let loader = file.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load())
            .await
            .map_err(|e| MedibotError::internal(format!("Failed to join task: {}", e)))?;

        let session_id = match loaded {
            Ok(slot) => slot.and_then(|s| s.session_id).filter(|id| !id.trim().is_empty()),
            Err(e) => {
                tracing::warn!(
                    "[SessionStore] Ignoring unreadable session file {}: {}",
                    file.path().display(),
                    e
                );
                None
            }
        };

        Ok(Self {
            cached: Arc::new(Mutex::new(session_id)),
            file,
        })
    }

    async fn persist(&self, session_id: Option<String>) -> Result<()> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || match session_id {
            Some(id) => file.replace(&SessionSlot {
                session_id: Some(id),
            }),
            None => file.remove(),
        })
        .await
        .map_err(|e| MedibotError::internal(format!("Failed to join task: {}", e)))?
        .map_err(MedibotError::from)
    }
}

#[async_trait]
impl SessionStore for TomlSessionStore {
    async fn get(&self) -> SessionInfo {
        SessionInfo::from_optional(self.cached.lock().await.clone())
    }

    async fn set(&self, session_id: &str) -> Result<()> {
        let mut cached = self.cached.lock().await;
        self.persist(Some(session_id.to_string())).await?;
        *cached = Some(session_id.to_string());
        tracing::debug!("[SessionStore] Stored session {}", session_id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut cached = self.cached.lock().await;
        self.persist(None).await?;
        *cached = None;
        tracing::debug!("[SessionStore] Cleared session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_first_run_has_no_session() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlSessionStore::with_path(temp_dir.path().join("session.toml"))
            .await
            .unwrap();

        assert_eq!(store.get().await, SessionInfo::none());
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");

        let store = TomlSessionStore::with_path(path.clone()).await.unwrap();
        store.set("abc").await.unwrap();
        drop(store);

        let reopened = TomlSessionStore::with_path(path.clone()).await.unwrap();
        assert_eq!(reopened.get().await, SessionInfo::with_id("abc"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("session_id = \"abc\""));
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");

        let store = TomlSessionStore::with_path(path.clone()).await.unwrap();
        store.set("abc").await.unwrap();
        store.clear().await.unwrap();

        assert!(!store.get().await.has_session);
        assert!(!path.exists());

        let reopened = TomlSessionStore::with_path(path).await.unwrap();
        assert!(!reopened.get().await.has_session);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty_slot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");
        std::fs::write(&path, "session_id = ").unwrap();

        let store = TomlSessionStore::with_path(path.clone()).await.unwrap();
        assert!(!store.get().await.has_session);

        // The next write replaces the corrupt file.
        store.set("xyz").await.unwrap();
        let reopened = TomlSessionStore::with_path(path).await.unwrap();
        assert_eq!(reopened.get().await, SessionInfo::with_id("xyz"));
    }

    #[tokio::test]
    async fn test_blank_id_is_no_session() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");
        std::fs::write(&path, "session_id = \"  \"").unwrap();

        let store = TomlSessionStore::with_path(path).await.unwrap();
        assert!(!store.get().await.has_session);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be makes every write fail.
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let store = TomlSessionStore::with_path(blocker.join("session.toml"))
            .await
            .unwrap();
        assert!(store.set("abc").await.is_err());
        assert_eq!(store.get().await, SessionInfo::none());
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_cached_session() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");
        let store = TomlSessionStore::with_path(path.clone()).await.unwrap();
        store.set("abc").await.unwrap();

        // Replace the file with a directory so removal fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.clear().await.is_err());
        assert_eq!(store.get().await, SessionInfo::with_id("abc"));
    }
}
