//! Client-side session persistence.
//!
//! The session record (token + user snapshot) is owned exclusively by a
//! [`SessionStore`]; UI code never touches the storage directly. Stores
//! serialize their own read-modify-write so a concurrent refresh cannot
//! drop the user snapshot, even though callers are free to race.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::error::ClientError;

/// Denormalized copy of the user captured at login, kept for immediate
/// rendering. May go stale after profile edits elsewhere; that is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSnapshot {
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Role-specific profile fields (grade, parent contact, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The persisted session: current token plus the user snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub token: String,
    pub user: UserSnapshot,
}

/// Persistence for the current session.
///
/// `set_token` is the read-modify-write path used by token refresh;
/// implementations must serialize it internally.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<SessionRecord>, ClientError>;
    async fn save(&self, record: SessionRecord) -> Result<(), ClientError>;
    /// Replace only the token, keeping the user snapshot.
    /// No-op when no session is stored.
    async fn set_token(&self, token: String) -> Result<(), ClientError>;
    async fn clear(&self) -> Result<(), ClientError>;
}

/// File-backed store persisting the session as JSON across process restarts.
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes load-then-save sequences; file I/O itself is not atomic.
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_record(&self) -> Result<Option<SessionRecord>, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| ClientError::store(format!("Corrupt session file: {}", e)))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::store(format!(
                "Failed to read session file: {}",
                e
            ))),
        }
    }

    async fn write_record(&self, record: &SessionRecord) -> Result<(), ClientError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| ClientError::store(format!("Failed to encode session: {}", e)))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| ClientError::store(format!("Failed to write session file: {}", e)))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<SessionRecord>, ClientError> {
        let _guard = self.lock.lock().await;
        self.read_record().await
    }

    async fn save(&self, record: SessionRecord) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        self.write_record(&record).await
    }

    async fn set_token(&self, token: String) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        if let Some(mut record) = self.read_record().await? {
            record.token = token;
            self.write_record(&record).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::store(format!(
                "Failed to remove session file: {}",
                e
            ))),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a session.
    pub fn with_record(record: SessionRecord) -> Self {
        Self {
            inner: Mutex::new(Some(record)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionRecord>, ClientError> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, record: SessionRecord) -> Result<(), ClientError> {
        *self.inner.lock().await = Some(record);
        Ok(())
    }

    async fn set_token(&self, token: String) -> Result<(), ClientError> {
        let mut guard = self.inner.lock().await;
        if let Some(record) = guard.as_mut() {
            record.token = token;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.inner.lock().await = None;
        Ok(())
    }
}
