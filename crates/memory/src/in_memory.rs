//! In-memory session store — history lives for the process lifetime.

use async_trait::async_trait;
use kotodama_core::error::MemoryError;
use kotodama_core::memory::{Appended, SessionStore};
use kotodama_core::message::{Session, SessionKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// A session store that keeps every session in a map.
///
/// The map lock is only held long enough to find or insert a session handle.
/// Each session has its own lock, so exchanges on different keys never wait
/// on each other, and an exchange on one key is applied as a single step.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionKey, Arc<Mutex<Session>>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The handle for `key`, inserting an empty session if absent.
    async fn handle(&self, key: &SessionKey) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.read().await.get(key) {
            return existing.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(session = %key, "Creating session");
                Arc::new(Mutex::new(Session::new(key.clone())))
            })
            .clone()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_or_create(&self, key: &SessionKey) -> Session {
        let handle = self.handle(key).await;
        let session = handle.lock().await;
        session.clone()
    }

    async fn append_exchange(
        &self,
        key: &SessionKey,
        epoch: u64,
        input: &str,
        reply: &str,
    ) -> Result<Appended, MemoryError> {
        let handle = self.handle(key).await;
        let mut session = handle.lock().await;
        if session.epoch() != epoch {
            debug!(
                session = %key,
                expected_epoch = epoch,
                epoch = session.epoch(),
                "Dropping exchange from before a reset"
            );
            return Ok(Appended::Stale);
        }
        session.push_exchange(input, reply);
        debug!(session = %key, turns = session.len(), "Recorded exchange");
        Ok(Appended::Recorded)
    }

    async fn reset(&self, key: &SessionKey) -> Result<(), MemoryError> {
        let handle = self.handle(key).await;
        handle.lock().await.clear();
        debug!(session = %key, "Session cleared");
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), MemoryError> {
        let handles: Vec<_> = self.sessions.read().await.values().cloned().collect();
        for handle in &handles {
            handle.lock().await.clear();
        }
        debug!(sessions = handles.len(), "All sessions cleared");
        Ok(())
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
