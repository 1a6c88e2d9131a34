//! The conversation pipeline of Kotodama.
//!
//! For every inbound text message:
//!
//! 1. **Parse** — the exact reset keyword clears history; anything else is chat
//! 2. **Compose** — persona system prompt + windowed session history + input
//! 3. **Invoke** — one non-streaming completion call through the provider
//! 4. **Record** — the user/assistant pair is appended to the session
//!
//! A failed completion never reaches the user as an error: [`ChatBot`] turns
//! it into the configured fallback reply.

pub mod bot;
pub mod composer;
pub mod invoker;

#[cfg(test)]
mod test_helpers;

pub use bot::{BotReply, ChatBot, Command, ReplyKind};
pub use composer::{HistoryWindow, PromptComposer};
pub use invoker::{CompletionInvoker, ModelSettings};
