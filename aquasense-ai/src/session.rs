//! Per-session conversation memory
//!
//! Keeps a bounded list of recent turns per session id so that follow-up
//! analyses can give the validator context. Sessions idle past the expiry
//! window are dropped by [`SessionMemory::cleanup_expired`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_MAX_HISTORY: usize = 50;
pub const DEFAULT_EXPIRY_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct Session {
    turns: VecDeque<ConversationTurn>,
    last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionMemory {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_history: usize,
    expiry: Duration,
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY, Duration::minutes(DEFAULT_EXPIRY_MINUTES))
    }
}

impl SessionMemory {
    pub fn new(max_history: usize, expiry: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_history: max_history.max(1),
            expiry,
        }
    }

    /// Append a turn, evicting the oldest once the history is full
    pub async fn add_turn(&self, session_id: &str, role: TurnRole, content: impl Into<String>) {
        let turn = ConversationTurn::new(role, content);
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| Session {
            turns: VecDeque::new(),
            last_activity: turn.timestamp,
        });

        session.last_activity = turn.timestamp;
        session.turns.push_back(turn);
        while session.turns.len() > self.max_history {
            session.turns.pop_front();
        }
    }

    /// Up to `limit` most recent turns, oldest first; empty for unknown or expired sessions
    pub async fn recent(&self, session_id: &str, limit: usize) -> Vec<ConversationTurn> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) if !self.is_expired(session, Utc::now()) => {
                let skip = session.turns.len().saturating_sub(limit);
                session.turns.iter().skip(skip).cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle longer than the expiry window; returns how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now()).await
    }

    async fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = sessions.len(), "Expired sessions removed");
        }
        removed
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_activity > self.expiry
    }
}
