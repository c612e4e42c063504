use std::error::Error;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::turn::{ChatTurn, TurnRole};

/// Error type for session store operations
#[derive(Debug)]
pub enum SessionStoreError {
    /// Session not found
    NotFound(String),
    /// Error occurred during a store operation
    StorageError(String),
}

impl Display for SessionStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStoreError::NotFound(id) => write!(f, "Session not found: {}", id),
            SessionStoreError::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl Error for SessionStoreError {}

/// One conversation and its ordered turns
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time a turn was appended
    pub updated_at: DateTime<Utc>,
    /// Sliding expiry, pushed forward on every append
    pub expires_at: Option<DateTime<Utc>>,
    /// Turns in append order
    pub turns: Vec<ChatTurn>,
}

impl Session {
    /// Create a new session with the given ID
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            expires_at: None,
            turns: Vec::new(),
        }
    }

    /// Append a turn and push the expiry forward by `ttl`, if any
    pub fn push(&mut self, turn: ChatTurn, ttl: Option<Duration>) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
        self.expires_at = ttl.map(|ttl| self.updated_at + ttl);
    }

    /// Keep only the most recent `max_turns` turns; returns how many were dropped
    pub fn truncate(&mut self, max_turns: usize) -> usize {
        let excess = self.turns.len().saturating_sub(max_turns);
        if excess > 0 {
            self.turns.drain(..excess);
        }
        excess
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }

    pub fn stats(&self) -> SessionStats {
        let count = |role: TurnRole| self.turns.iter().filter(|t| t.role == role).count();
        let total_chars: usize = self.turns.iter().map(|t| t.content.chars().count()).sum();
        let avg_message_length = if self.turns.is_empty() {
            0
        } else {
            (total_chars as f64 / self.turns.len() as f64).round() as usize
        };

        SessionStats {
            total_messages: self.turns.len(),
            user_messages: count(TurnRole::User),
            assistant_messages: count(TurnRole::Assistant),
            conversation_start: self.turns.first().map(|t| t.timestamp),
            last_message: self.turns.last().map(|t| t.timestamp),
            avg_message_length,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.turns.len(),
        }
    }
}

/// Per-session counters exposed by the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub conversation_start: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
    pub avg_message_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Trait defining the interface for session stores
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Turns of a session in append order; unknown or expired sessions are empty
    async fn get(&self, id: &str) -> Result<Vec<ChatTurn>, SessionStoreError>;

    /// Get a session by ID
    async fn get_session(&self, id: &str) -> Result<Session, SessionStoreError>;

    /// Append a turn, creating the session on first use
    async fn append(&self, id: &str, turn: ChatTurn) -> Result<(), SessionStoreError>;

    /// Drop the oldest turns beyond `max_turns`; returns how many were dropped
    async fn truncate(&self, id: &str, max_turns: usize) -> Result<usize, SessionStoreError>;

    /// Remove a session; returns whether it existed
    async fn clear(&self, id: &str) -> Result<bool, SessionStoreError>;

    /// Delete expired sessions
    async fn cleanup_expired_sessions(&self) -> Result<usize, SessionStoreError>;

    /// List all active (non-expired) sessions
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionStoreError>;
}

/// Type alias for Arc-wrapped SessionStore trait objects
pub type SessionStoreRef = Arc<dyn SessionStore>;
