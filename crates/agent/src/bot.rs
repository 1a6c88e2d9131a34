//! The per-message state machine: reset command or chat completion.

use std::sync::Arc;

use kotodama_config::{AppConfig, ResetConfig, ResetScope};
use kotodama_core::memory::SessionStore;
use kotodama_core::message::SessionKey;
use kotodama_core::persona::Persona;
use kotodama_core::provider::Provider;
use tracing::{error, info, warn};

use crate::composer::{HistoryWindow, PromptComposer};
use crate::invoker::{CompletionInvoker, ModelSettings};

/// What an inbound text asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Clear conversation history.
    Reset,
    /// Talk to the persona.
    Chat(&'a str),
}

impl<'a> Command<'a> {
    /// `Reset` only when `text` is exactly the reserved keyword.
    pub fn parse(text: &'a str, reset_keyword: &str) -> Self {
        if text == reset_keyword {
            Self::Reset
        } else {
            Self::Chat(text)
        }
    }
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Generated by the model.
    Completion,
    /// Fixed confirmation after clearing history.
    Reset,
    /// Fixed apology after a failed completion.
    Fallback,
}

/// The text to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub kind: ReplyKind,
}

/// Handles one inbound message at a time for a given session.
pub struct ChatBot {
    invoker: CompletionInvoker,
    reset: ResetConfig,
    fallback_reply: String,
}

impl ChatBot {
    pub fn new(invoker: CompletionInvoker) -> Self {
        Self {
            invoker,
            reset: ResetConfig::default(),
            fallback_reply: kotodama_config::DEFAULT_FALLBACK_REPLY.into(),
        }
    }

    /// Assemble the whole pipeline from configuration.
    ///
    /// Fails only when a configured persona file cannot be loaded.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
    ) -> kotodama_core::Result<Self> {
        let persona = Persona::load(config.persona.file.as_deref(), config.persona.name.as_deref())?;
        info!(
            persona = %persona.name,
            source = ?persona.source,
            prompt_tokens = persona.estimated_tokens(),
            "Persona loaded"
        );

        let invoker = CompletionInvoker::new(provider, store, Arc::new(persona))
            .with_composer(PromptComposer::new(HistoryWindow::from_turns(
                config.history.window_turns,
            )))
            .with_settings(ModelSettings::from(&config.model));

        Ok(Self::new(invoker)
            .with_reset(config.reset.clone())
            .with_fallback_reply(config.fallback_reply.clone()))
    }

    pub fn with_reset(mut self, reset: ResetConfig) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_fallback_reply(mut self, text: impl Into<String>) -> Self {
        self.fallback_reply = text.into();
        self
    }

    pub fn reset_keyword(&self) -> &str {
        &self.reset.keyword
    }

    /// Produce the reply for `text` in session `key`. Never fails: errors are
    /// logged and turned into the fallback reply.
    pub async fn handle(&self, key: &SessionKey, text: &str) -> BotReply {
        match Command::parse(text, &self.reset.keyword) {
            Command::Reset => self.handle_reset(key).await,
            Command::Chat(input) => match self.invoker.invoke(key, input).await {
                Ok(reply) => BotReply {
                    text: reply,
                    kind: ReplyKind::Completion,
                },
                Err(e) => {
                    error!(session = %key, error = %e, "Completion failed, sending fallback reply");
                    self.fallback()
                }
            },
        }
    }

    async fn handle_reset(&self, key: &SessionKey) -> BotReply {
        let store = self.invoker.store();
        let result = match self.reset.scope {
            ResetScope::Session => store.reset(key).await,
            ResetScope::All => store.reset_all().await,
        };

        match result {
            Ok(()) => {
                info!(session = %key, scope = ?self.reset.scope, "Conversation reset");
                BotReply {
                    text: self.reset.confirmation.clone(),
                    kind: ReplyKind::Reset,
                }
            }
            Err(e) => {
                warn!(session = %key, error = %e, "Reset failed");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> BotReply {
        BotReply {
            text: self.fallback_reply.clone(),
            kind: ReplyKind::Fallback,
        }
    }
}
