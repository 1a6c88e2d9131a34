//! Messaging channel implementations for Kotodama.
//!
//! A channel verifies and parses inbound webhook deliveries and sends reply
//! text back to the platform.
//!
//! Available channels:
//! - **LINE** — LINE Messaging API webhooks and reply endpoint

pub mod line;

pub use line::{LineChannel, LineConfig};
