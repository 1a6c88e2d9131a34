//! Completion invocation — one model call per chat message.

use std::sync::Arc;

use kotodama_core::error::CompletionError;
use kotodama_core::memory::{Appended, SessionStore};
use kotodama_core::message::SessionKey;
use kotodama_core::persona::Persona;
use kotodama_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info};

use crate::composer::PromptComposer;

/// Model parameters, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: 0.4,
            max_tokens: None,
        }
    }
}

impl From<&kotodama_config::ModelConfig> for ModelSettings {
    fn from(config: &kotodama_config::ModelConfig) -> Self {
        Self {
            model: config.name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Turns user input into a reply and records the exchange.
///
/// The session is read once before the call and written once after it;
/// no session lock is held while the provider is working. A reset that lands
/// in between wins: the reply is still returned, but not recorded.
pub struct CompletionInvoker {
    provider: Arc<dyn Provider>,
    store: Arc<dyn SessionStore>,
    persona: Arc<Persona>,
    composer: PromptComposer,
    settings: ModelSettings,
}

impl CompletionInvoker {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn SessionStore>,
        persona: Arc<Persona>,
    ) -> Self {
        Self {
            provider,
            store,
            persona,
            composer: PromptComposer::default(),
            settings: ModelSettings::default(),
        }
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Compose, call the model, and append the exchange on success.
    ///
    /// On any error the session is left untouched.
    pub async fn invoke(&self, key: &SessionKey, input: &str) -> Result<String, CompletionError> {
        let snapshot = self.store.get_or_create(key).await;
        let messages = self.composer.compose(&self.persona, snapshot.turns(), input);

        debug!(
            session = %key,
            epoch = snapshot.epoch(),
            stored_turns = snapshot.len(),
            prompt_messages = messages.len(),
            "Composed prompt"
        );

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream: false,
        };

        let response = self.provider.complete(request).await?;
        let reply = response.message.content;

        if reply.trim().is_empty() {
            return Err(CompletionError::EmptyReply);
        }

        let appended = self
            .store
            .append_exchange(key, snapshot.epoch(), input, &reply)
            .await?;

        info!(
            session = %key,
            recorded = appended == Appended::Recorded,
            model = %response.model,
            tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0),
            reply_chars = reply.chars().count(),
            "Completion succeeded"
        );

        Ok(reply)
    }
}
