//! SessionStore trait — conversation history keyed by session.
//!
//! The store hands out snapshots; callers never hold a reference into it
//! across an await point. Mutation of a single session is serialized by the
//! implementation while different sessions proceed independently.
//!
//! Because the snapshot and the append are separate steps, an append names
//! the epoch its snapshot came from. A reset in between makes it stale.

use async_trait::async_trait;
use crate::error::MemoryError;
use crate::message::{Message, Session, SessionKey};

/// Outcome of [`SessionStore::append_exchange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// The exchange is now part of the session.
    Recorded,
    /// The session was reset after the snapshot was taken; nothing was stored.
    Stale,
}

/// The core SessionStore trait.
///
/// Implementations: in-memory (process lifetime). The trait is the seam
/// for swapping in another backing store without touching the bot.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return a snapshot of the session for `key`, registering an empty one
    /// if none exists yet.
    async fn get_or_create(&self, key: &SessionKey) -> Session;

    /// The ordered turns of the session for `key` (created if absent).
    async fn history(&self, key: &SessionKey) -> Vec<Message> {
        self.get_or_create(key).await.turns().to_vec()
    }

    /// Append one user/assistant exchange as a single atomic step, provided
    /// the session is still in `epoch`.
    async fn append_exchange(
        &self,
        key: &SessionKey,
        epoch: u64,
        input: &str,
        reply: &str,
    ) -> std::result::Result<Appended, MemoryError>;

    /// Clear the turns of one session and start its next epoch.
    async fn reset(&self, key: &SessionKey) -> std::result::Result<(), MemoryError>;

    /// Clear the turns of every session, advancing each epoch.
    async fn reset_all(&self) -> std::result::Result<(), MemoryError>;

    /// Number of registered sessions.
    async fn session_count(&self) -> usize;

    /// Number of stored turns in the session for `key`.
    async fn turn_count(&self, key: &SessionKey) -> usize {
        self.get_or_create(key).await.len()
    }
}
