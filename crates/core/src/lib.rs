//! # Kotodama Core
//!
//! Domain types, traits, and error definitions for the Kotodama persona chat bot.
//! This crate has **zero framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every boundary is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`] — hosted LLM completion API (`kotodama-providers`)
//! - [`Channel`] — messaging-platform webhook adapter (`kotodama-channels`)
//! - [`SessionStore`] — conversation history storage (`kotodama-memory`)

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod memory;
pub mod persona;

// Re-export key types at crate root for ergonomics
pub use error::{CompletionError, Error, Result};
pub use message::{Message, Role, Session, SessionKey};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use channel::{Channel, ChannelId, InboundEvent};
pub use memory::{Appended, SessionStore};
pub use persona::{Persona, PersonaSource};
