//! In-memory session store implementation using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use ripple_core::{
    config::SessionConfig,
    traits::{SessionHandle, SessionStore},
    types::Session,
    Result,
};

/// Capacity and idle lifetime of stored sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions kept before the least recently used one is evicted.
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped.
    pub idle_ttl: Duration,
}

impl SessionLimits {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_sessions: config.max_sessions.max(1),
            idle_ttl: Duration::from_secs(config.idle_ttl_secs.max(1)),
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

#[derive(Debug)]
struct StoredSession {
    handle: SessionHandle,
    last_access: Instant,
}

/// In-memory session store using DashMap for concurrent access.
///
/// Uploading to an existing ID replaces the handle, so in-flight stages
/// keep working on the session they started with. Idle sessions expire
/// and the least recently used one makes room when the store is full.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, StoredSession>,
    limits: SessionLimits,
}

impl InMemorySessionStore {
    /// Create a new in-memory session store with default limits.
    pub fn new() -> Self {
        Self::with_limits(SessionLimits::default())
    }

    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            limits,
        }
    }

    /// Get the number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_idle(&self, entry: &StoredSession, now: Instant) -> bool {
        now.duration_since(entry.last_access) >= self.limits.idle_ttl
    }

    fn evict_idle(&self, now: Instant) {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !self.is_idle(entry, now));
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle sessions");
        }
    }

    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());
        match oldest {
            Some(id) => {
                self.sessions.remove(&id);
                tracing::debug!(session_id = %id, "Evicted least recently used session");
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<SessionHandle> {
        let now = Instant::now();
        self.evict_idle(now);

        let id = session.id.clone();
        if !self.sessions.contains_key(&id) {
            while self.sessions.len() >= self.limits.max_sessions {
                if !self.evict_least_recent() {
                    break;
                }
            }
        }

        let handle = Arc::new(Mutex::new(session));
        let entry = StoredSession {
            handle: handle.clone(),
            last_access: now,
        };
        if self.sessions.insert(id.clone(), entry).is_some() {
            tracing::debug!(session_id = %id, "Session reset by new upload");
        }
        Ok(handle)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionHandle>> {
        let now = Instant::now();
        match self.sessions.get_mut(session_id) {
            None => return Ok(None),
            Some(mut entry) => {
                if !self.is_idle(&entry, now) {
                    entry.last_access = now;
                    return Ok(Some(entry.handle.clone()));
                }
            }
        }

        self.sessions
            .remove_if(session_id, |_, entry| self.is_idle(entry, now));
        tracing::debug!(session_id = %session_id, "Session expired");
        Ok(None)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.sessions.len())
    }
}
