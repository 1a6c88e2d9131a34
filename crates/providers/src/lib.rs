//! LLM Provider implementations for Kotodama.
//!
//! All providers implement the `kotodama_core::Provider` trait.
//! [`build_from_config`] assembles the provider the bot talks to.

pub mod openai_compat;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use kotodama_config::AppConfig;
use kotodama_core::Provider;
use kotodama_core::error::ProviderError;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;

/// Build the completion provider from configuration.
///
/// An OpenAI-compatible endpoint wrapped in the configured retry policy.
/// Fails when no API key is configured.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .provider
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

    let timeout = Duration::from_secs(config.provider.timeout_secs);
    let endpoint = OpenAiCompatProvider::new("openai", &config.provider.base_url, api_key, timeout)?;

    let provider = RetryProvider::new(Arc::new(endpoint))
        .with_max_attempts(config.retry.max_attempts)
        .with_timeout(timeout)
        .with_initial_backoff(Duration::from_millis(config.retry.initial_backoff_ms));

    Ok(Arc::new(provider))
}
