//! Provider retry — bounded re-attempts of one provider with per-attempt timeouts.
//!
//! Only transient failures (network, timeout, rate limit, 5xx) are retried.
//! Between attempts the wrapper sleeps with exponential backoff, stretched to
//! the provider's `Retry-After` hint when one was given.

use async_trait::async_trait;
use kotodama_core::error::ProviderError;
use kotodama_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that re-attempts transient failures of an inner provider.
pub struct RetryProvider {
    inner: Arc<dyn kotodama_core::Provider>,
    max_attempts: u32,
    timeout: Duration,
    initial_backoff: Duration,
}

impl RetryProvider {
    /// Wrap `inner` with a single attempt and a 60s timeout.
    pub fn new(inner: Arc<dyn kotodama_core::Provider>) -> Self {
        Self {
            inner,
            max_attempts: 1,
            timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(500),
        }
    }

    /// Total number of attempts, including the first. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Timeout applied to each attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay before the second attempt. Doubles after every further failure.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff_for(&self, failed_attempts: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(failed_attempts.saturating_sub(1)))
    }

    /// Backoff for `error`, never shorter than its `Retry-After` hint and
    /// never longer than one attempt's timeout.
    fn delay_after(&self, error: &ProviderError, failed_attempts: u32) -> Duration {
        let backoff = self.backoff_for(failed_attempts);
        match error {
            ProviderError::RateLimited {
                retry_after_secs: Some(secs),
            } => backoff.max(Duration::from_secs(*secs).min(self.timeout)),
            _ => backoff,
        }
    }
}

#[async_trait]
impl kotodama_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let provider_name = self.inner.name();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match tokio::time::timeout(
                self.timeout,
                self.inner.complete(request.clone()),
            )
            .await
            {
                Ok(Ok(response)) => {
                    if attempt > 1 {
                        info!(provider = %provider_name, attempt, "Retry: provider recovered");
                    }
                    return Ok(response);
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    self.timeout.as_secs_f32()
                )),
            };

            if !error.is_transient() || attempt >= self.max_attempts {
                warn!(
                    provider = %provider_name,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %error,
                    "Retry: giving up"
                );
                return Err(error);
            }

            let backoff = self.delay_after(&error, attempt);
            warn!(
                provider = %provider_name,
                attempt,
                max_attempts = self.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Retry: transient failure, retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        self.inner.list_models().await
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
