//! Session storage trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::types::Session;

/// Shared, lockable handle to one session.
///
/// Holding the lock serializes stages that mutate the session image.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Keyed store of live sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or reset a session, returning its handle.
    ///
    /// Stores may evict idle or surplus sessions to make room.
    async fn put(&self, session: Session) -> Result<SessionHandle>;

    /// Look up a session by ID. Evicted sessions read as absent.
    async fn get(&self, session_id: &str) -> Result<Option<SessionHandle>>;

    /// Number of live sessions.
    async fn count(&self) -> Result<usize>;
}
