use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, info};

use crate::session::store::{Session, SessionStore, SessionStoreError, SessionSummary};
use crate::turn::ChatTurn;

/// In-memory implementation of SessionStore
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    /// Thread-safe storage of sessions
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Idle time after which a session expires; `None` keeps sessions forever
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    /// Create a new InMemorySessionStore whose sessions never expire
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    fn lock_error(e: impl std::fmt::Display) -> SessionStoreError {
        SessionStoreError::StorageError(format!("Failed to acquire session lock: {}", e))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Result<Vec<ChatTurn>, SessionStoreError> {
        match self.get_session(id).await {
            Ok(session) => Ok(session.turns),
            Err(SessionStoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn get_session(&self, id: &str) -> Result<Session, SessionStoreError> {
        let sessions = self.sessions.read().map_err(Self::lock_error)?;

        let session = sessions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionStoreError::NotFound(id.to_string()))?;

        // Expired sessions stay invisible until cleanup removes them
        if session.is_expired() {
            return Err(SessionStoreError::NotFound(format!("Session expired: {}", id)));
        }

        Ok(session)
    }

    async fn append(&self, id: &str, turn: ChatTurn) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(Self::lock_error)?;

        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(session_id = %id, "Created session");
                Session::new(id.to_string())
            });
        if session.is_expired() {
            debug!(session_id = %id, "Session expired, starting over");
            *session = Session::new(id.to_string());
        }
        session.push(turn, self.ttl);
        Ok(())
    }

    async fn truncate(&self, id: &str, max_turns: usize) -> Result<usize, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(Self::lock_error)?;

        let dropped = sessions
            .get_mut(id)
            .map_or(0, |session| session.truncate(max_turns));
        if dropped > 0 {
            debug!(session_id = %id, dropped, "Truncated session history");
        }
        Ok(dropped)
    }

    async fn clear(&self, id: &str) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(Self::lock_error)?;

        let existed = sessions.remove(id).is_some();
        debug!(session_id = %id, existed, "Cleared session");
        Ok(existed)
    }

    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(Self::lock_error)?;

        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        let count = before - sessions.len();

        if count > 0 {
            info!(count, "Cleaned up expired sessions");
        }

        Ok(count)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionStoreError> {
        let sessions = self.sessions.read().map_err(Self::lock_error)?;

        let mut active: Vec<SessionSummary> = sessions
            .values()
            .filter(|session| !session.is_expired())
            .map(Session::summary)
            .collect();
        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        debug!("Listed {} active sessions", active.len());
        Ok(active)
    }
}
