//! Channel trait — the abstraction over messaging-platform webhooks.
//!
//! A Channel connects Kotodama to a messaging platform. The platform pushes
//! signed webhook deliveries to us; the channel verifies and parses them into
//! [`InboundEvent`]s and delivers reply text back using each event's reply token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A text message event extracted from a verified webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// The channel this event came from
    pub channel_id: ChannelId,

    /// Single-use token for replying to this event
    pub reply_token: String,

    /// The message text
    pub text: String,

    /// Platform-specific user ID of the sender (if the platform disclosed it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// The core Channel trait.
///
/// Implementations handle platform-specific signature schemes, payload
/// formats and reply delivery.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "line").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Verify the signature of a raw webhook body.
    fn verify_signature(&self, body: &[u8], signature: &str) -> std::result::Result<(), ChannelError>;

    /// Parse a raw (already verified) webhook body into text message events.
    ///
    /// Events that carry no text (stickers, follows, images, ...) are skipped.
    fn parse_events(&self, body: &[u8]) -> std::result::Result<Vec<InboundEvent>, ChannelError>;

    /// Verify, then parse. Nothing is parsed when the signature is wrong.
    fn receive(
        &self,
        body: &[u8],
        signature: &str,
    ) -> std::result::Result<Vec<InboundEvent>, ChannelError> {
        self.verify_signature(body, signature)?;
        self.parse_events(body)
    }

    /// Deliver reply text for the event identified by `reply_token`.
    async fn reply(&self, reply_token: &str, text: &str) -> std::result::Result<(), ChannelError>;

    /// Health check — is the channel configured and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}
