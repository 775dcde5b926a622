//! Explicit authentication context shared by everything that talks to the
//! course API. Holders subscribe to changes instead of listening for a
//! global event.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// JSON file holding the last session so it survives restarts.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let body = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, body)?;
        debug!("session saved to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    session: watch::Sender<Option<Session>>,
    store: Option<SessionStore>,
}

impl AuthContext {
    /// Context without persistence.
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Context backed by a session file; an existing session is restored.
    /// An unreadable file is logged and treated as signed out.
    pub fn with_store(store: SessionStore) -> Self {
        let restored = match store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("ignoring unreadable session file {}: {}", store.path().display(), e);
                None
            }
        };
        if let Some(session) = &restored {
            info!("restored session for {}", session.user.email);
        }
        Self::build(restored, Some(store))
    }

    fn build(session: Option<Session>, store: Option<SessionStore>) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self {
            inner: Arc::new(AuthInner { session: tx, store }),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.inner.session.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.inner.session.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.borrow().is_some()
    }

    /// Receiver that wakes on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session.subscribe()
    }

    pub fn sign_in(&self, session: Session) -> Result<(), AppError> {
        if let Some(store) = &self.inner.store {
            store.save(&session)?;
        }
        info!("signed in as {}", session.user.email);
        self.inner.session.send_replace(Some(session));
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), AppError> {
        if let Some(store) = &self.inner.store {
            store.clear()?;
        }
        if self.inner.session.send_replace(None).is_some() {
            info!("signed out");
        }
        Ok(())
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            token: "token-123".to_string(),
            user: User {
                id: 1,
                email: "jane@example.com".to_string(),
                username: "jane".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn sign_in_notifies_subscribers() {
        let auth = AuthContext::new();
        let mut rx = auth.subscribe();

        auth.sign_in(session()).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|s| s.token.as_str()), Some("token-123"));
        assert_eq!(auth.user().map(|u| u.username), Some("jane".to_string()));
    }

    #[tokio::test]
    async fn sign_out_clears_state_and_notifies() {
        let auth = AuthContext::new();
        auth.sign_in(session()).unwrap();
        let mut rx = auth.subscribe();

        auth.sign_out().unwrap();

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(!auth.is_authenticated());
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn store_round_trips_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let auth = AuthContext::with_store(store.clone());
        assert!(!auth.is_authenticated());
        auth.sign_in(session()).unwrap();

        let restored = AuthContext::with_store(store.clone());
        assert_eq!(restored.token().as_deref(), Some("token-123"));

        restored.sign_out().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_store_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let auth = AuthContext::with_store(SessionStore::new(path));
        assert!(!auth.is_authenticated());
    }
}
