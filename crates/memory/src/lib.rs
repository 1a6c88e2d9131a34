//! Session store implementations for Kotodama.

pub mod in_memory;

pub use in_memory::InMemorySessionStore;
