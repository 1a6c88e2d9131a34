//! Message and Session domain types.
//!
//! These are the core value objects that flow through the entire system:
//! User sends a message → Channel receives it → Bot composes a prompt →
//! Provider generates a reply → the exchange is recorded in the Session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self("default".into())
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The persona answering
    Assistant,
    /// Persona instructions; only ever the first message of a composed prompt
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// A conversation session: an ordered, append-only list of turns.
///
/// Turns are only ever added as a complete user/assistant pair through
/// [`Session::push_exchange`], so the history always alternates
/// user → assistant and never holds a system message.
///
/// Every [`Session::clear`] starts a new epoch. An exchange composed from an
/// older epoch's history must not be recorded into the new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session key
    pub key: SessionKey,

    /// Ordered turns
    turns: Vec<Message>,

    /// Number of times the session has been cleared
    epoch: u64,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last exchange was added (or the session was cleared)
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session.
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            turns: Vec::new(),
            epoch: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The recorded turns, oldest first.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Record one exchange: the user's input followed by the assistant's reply.
    pub fn push_exchange(&mut self, input: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(Message::user(input));
        self.turns.push(Message::assistant(reply));
        self.updated_at = Utc::now();
    }

    /// Drop every turn and start a new epoch. The session itself stays registered.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.epoch += 1;
        self.updated_at = Utc::now();
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
