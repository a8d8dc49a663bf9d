//! Bearer-token session state.
//!
//! Login itself happens elsewhere; this module only holds the token the
//! gateway attaches to each request and drops it when the backend answers
//! 401.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SESSION_HOME_ENV: &str = "SPOOL_CLI_HOME";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub email: Option<String>,
    pub saved_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            email: None,
            saved_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Source of the bearer token for outbound requests.
pub trait SessionStore: Send + Sync {
    fn current(&self) -> Option<Session>;

    fn save(&self, session: Session) -> Result<(), SessionError>;

    /// Forgets the session. Called when the backend rejects the token.
    fn clear(&self) -> Result<(), SessionError>;

    fn token(&self) -> Option<String> {
        self.current()
            .map(|session| session.access_token)
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            session: RwLock::new(Some(Session::new(token))),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: Session) -> Result<(), SessionError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Session persisted as pretty JSON. The file is read once on open and kept
/// in memory afterwards.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cached: RwLock<Option<Session>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let cached = read_session(&path)?;
        debug!(path = %path.display(), present = cached.is_some(), "Opened session store");
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `$SPOOL_CLI_HOME/session.json`, falling back to
    /// `$HOME/.spoolctl/session.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(SESSION_HOME_ENV) {
            let mut path = PathBuf::from(dir);
            path.push("session.json");
            return Some(path);
        }

        std::env::var("HOME").ok().map(|home| {
            let mut path = PathBuf::from(home);
            path.push(".spoolctl");
            path.push("session.json");
            path
        })
    }
}

impl SessionStore for FileSessionStore {
    fn current(&self) -> Option<Session> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_vec_pretty(&session).map_err(|source| SessionError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, payload).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        info!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|source| SessionError::Io {
                path: self.path.clone(),
                source,
            })?;
            warn!(path = %self.path.display(), "Cleared session file");
        }
        Ok(())
    }
}

fn read_session(path: &Path) -> Result<Option<Session>, SessionError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let session = serde_json::from_str(&data).map_err(|source| SessionError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.token().is_none());
        store.save(Session::new("abc")).unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let store = MemorySessionStore::with_token("  ");
        assert!(store.token().is_none());
    }

    #[test]
    fn file_store_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileSessionStore::open(&path).unwrap();
        assert!(store.current().is_none());
        store
            .save(Session::new("tok-1").with_email("maker@example.com"))
            .unwrap();
        assert!(path.exists());

        let reopened = FileSessionStore::open(&path).unwrap();
        let session = reopened.current().unwrap();
        assert_eq!(session.access_token, "tok-1");
        assert_eq!(session.email.as_deref(), Some("maker@example.com"));

        reopened.clear().unwrap();
        assert!(!path.exists());
        assert!(reopened.token().is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileSessionStore::open(&path),
            Err(SessionError::Parse { .. })
        ));
    }
}
