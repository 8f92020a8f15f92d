//! Session repository keyed by an opaque session id.

use crate::session::Session;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque identifier handed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Storage for game sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: SessionId) -> Option<Session>;

    async fn set(&self, id: SessionId, session: Session);

    async fn clear(&self, id: SessionId);

    /// Drop every expired session. Returns how many were removed.
    async fn purge_expired(&self) -> usize {
        0
    }
}

struct StoredSession {
    session: Session,
    touched: Instant,
}

/// Default upper bound on live sessions in an [`InMemorySessionStore`].
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Process-local store; sessions expire after `ttl` without access.
///
/// Holds at most `max_sessions` entries. Inserting a new id into a full
/// store first drops expired sessions, then the least recently used one.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    ttl: Duration,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Set the session cap. A cap of zero is treated as one.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: SessionId) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let expired = sessions.get(&id)?.touched.elapsed() >= self.ttl;

        if expired {
            sessions.remove(&id);
            tracing::debug!(session = %id, "session expired");
            return None;
        }

        let stored = sessions.get_mut(&id)?;
        stored.touched = Instant::now();
        Some(stored.session.clone())
    }

    async fn set(&self, id: SessionId, session: Session) {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(&id) && sessions.len() >= self.max_sessions {
            let ttl = self.ttl;
            sessions.retain(|_, stored| stored.touched.elapsed() < ttl);

            if sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, stored)| stored.touched)
                    .map(|(id, _)| *id);
                if let Some(oldest) = oldest {
                    sessions.remove(&oldest);
                    tracing::debug!(session = %oldest, "evicted least recently used session");
                }
            }
        }

        sessions.insert(
            id,
            StoredSession {
                session,
                touched: Instant::now(),
            },
        );
    }

    async fn clear(&self, id: SessionId) {
        self.sessions.write().await.remove(&id);
    }

    async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, stored| stored.touched.elapsed() < ttl);
        before - sessions.len()
    }
}
