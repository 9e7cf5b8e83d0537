//! Session context.
//!
//! The signed-in user's bearer token and user type live in an explicit
//! [`AuthContext`] that is created once, handed to the API client, and torn
//! down on logout. Persistence goes through a [`SessionStore`], so the same
//! context works with a file on disk or purely in memory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use clubhouse_core::{MemberId, UserType};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from loading, saving or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the session file failed.
    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session could not be parsed.
    #[error("corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// An operation needed a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// The signed-in user's type is not allowed to do this.
    #[error("{actual} accounts cannot perform this action")]
    Forbidden { actual: UserType },
}

/// A signed-in user.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Session {
    pub token: SecretString,
    pub user_type: UserType,
    pub user_id: MemberId,
    pub signed_in_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user_type", &self.user_type)
            .field("user_id", &self.user_id)
            .field("signed_in_at", &self.signed_in_at)
            .finish()
    }
}

/// On-disk representation of a [`Session`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    token: String,
    user_type: UserType,
    user_id: MemberId,
    signed_in_at: DateTime<Utc>,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token.expose_secret().to_owned(),
            user_type: session.user_type,
            user_id: session.user_id.clone(),
            signed_in_at: session.signed_in_at,
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            token: SecretString::from(stored.token),
            user_type: stored.user_type,
            user_id: stored.user_id,
            signed_in_at: stored.signed_in_at,
        }
    }
}

/// Where sessions are persisted between runs.
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or is corrupt.
    fn load(&self) -> Result<Option<Session>, SessionError>;

    /// Persist `session`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Remove the persisted session. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be modified.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Session persisted as a JSON file (owner read/write only on Unix).
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let stored: StoredSession = serde_json::from_slice(&bytes)?;
                Ok(Some(stored.into()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        use std::io::Write;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(&serde_json::to_vec(&StoredSession::from(session))?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Session held only in memory; used by tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

/// The explicit session context passed to everything that talks to the backend.
///
/// Cheaply cloneable; clones share the same session.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<AuthContextInner>,
}

struct AuthContextInner {
    store: Box<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl AuthContext {
    /// Create a context over `store` without loading anything yet.
    #[must_use]
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            inner: Arc::new(AuthContextInner {
                store: Box::new(store),
                current: RwLock::new(None),
            }),
        }
    }

    /// A context that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStore::default())
    }

    /// Load the persisted session into the context.
    ///
    /// Returns the user type of the restored session, if there was one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn init(&self) -> Result<Option<UserType>, SessionError> {
        let session = self.inner.store.load()?;
        let user_type = session.as_ref().map(|s| s.user_type);
        if let Some(user_type) = user_type {
            tracing::debug!(%user_type, "Restored persisted session");
        }
        *self.inner.current.write().await = session;
        Ok(user_type)
    }

    /// Make `session` current and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written; the in-memory
    /// session is still set.
    pub async fn sign_in(&self, session: Session) -> Result<(), SessionError> {
        let result = self.inner.store.save(&session);
        *self.inner.current.write().await = Some(session);
        result
    }

    /// Forget the current session and remove it from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared; the in-memory
    /// session is still dropped.
    pub async fn teardown(&self) -> Result<(), SessionError> {
        *self.inner.current.write().await = None;
        self.inner.store.clear()
    }

    /// The current session, if signed in.
    pub async fn current(&self) -> Option<Session> {
        self.inner.current.read().await.clone()
    }

    /// The current bearer token, if signed in.
    pub async fn bearer_token(&self) -> Option<SecretString> {
        self.inner
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.token.clone())
    }

    /// Require a signed-in user of one of `allowed` types.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` or `SessionError::Forbidden`.
    pub async fn require_role(&self, allowed: &[UserType]) -> Result<Session, SessionError> {
        let session = self.current().await.ok_or(SessionError::NotSignedIn)?;
        if allowed.contains(&session.user_type) {
            Ok(session)
        } else {
            Err(SessionError::Forbidden {
                actual: session.user_type,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session(user_type: UserType) -> Session {
        Session {
            token: SecretString::from("tok_abc123"),
            user_type,
            user_id: MemberId::new("m-1"),
            signed_in_at: Utc::now(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("clubhouse-test-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    #[test]
    fn test_file_store_roundtrip() {
        let store = FileSessionStore::new(temp_path());
        assert!(store.load().unwrap().is_none());

        store.save(&session(UserType::Admin)).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user_type, UserType::Admin);
        assert_eq!(loaded.token.expose_secret(), "tok_abc123");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();

        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn test_file_store_corrupt() {
        let store = FileSessionStore::new(temp_path());
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), b"{not json").unwrap();

        assert!(matches!(store.load(), Err(SessionError::Corrupt(_))));
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let debug_output = format!("{:?}", session(UserType::Member));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_abc123"));
    }

    #[tokio::test]
    async fn test_auth_context_lifecycle() {
        let auth = AuthContext::in_memory();
        assert_eq!(auth.init().await.unwrap(), None);
        assert!(auth.bearer_token().await.is_none());

        auth.sign_in(session(UserType::Member)).await.unwrap();
        assert_eq!(
            auth.bearer_token().await.unwrap().expose_secret(),
            "tok_abc123"
        );

        auth.teardown().await.unwrap();
        assert!(auth.current().await.is_none());
        assert_eq!(auth.init().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_init_restores_persisted_session() {
        let store = MemorySessionStore::default();
        store.save(&session(UserType::SystemOwner)).unwrap();

        let auth = AuthContext::new(store);
        assert_eq!(auth.init().await.unwrap(), Some(UserType::SystemOwner));
    }

    #[tokio::test]
    async fn test_require_role() {
        let auth = AuthContext::in_memory();
        assert!(matches!(
            auth.require_role(&[UserType::Admin]).await,
            Err(SessionError::NotSignedIn)
        ));

        auth.sign_in(session(UserType::Member)).await.unwrap();
        assert!(matches!(
            auth.require_role(&[UserType::Admin, UserType::SystemOwner]).await,
            Err(SessionError::Forbidden {
                actual: UserType::Member
            })
        ));
        assert!(auth.require_role(&[UserType::Member]).await.is_ok());
    }
}
