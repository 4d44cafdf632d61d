//! Bounded, cancellable calls to a text generator
//!
//! Each attempt runs under its own timeout. Retryable failures back off
//! exponentially (`base * 2^n`); non-retryable failures stop immediately.
//! Every wait observes the caller's cancellation token.

use super::parser::{parse_disease_reply, parse_water_quality_reply};
use super::{DiseaseValidation, GenerationError, TextGenerator, ValidationOutcome, ValidationResult};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            attempt_timeout: Duration::from_secs(12),
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2*base, 4*base, ...
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[derive(Clone)]
pub struct ValidationClient {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
}

impl ValidationClient {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_configured()
    }

    pub fn backend(&self) -> &'static str {
        self.generator.name()
    }

    pub async fn validate_water_quality(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> ValidationOutcome<ValidationResult> {
        match self.request(prompt, cancel).await {
            Ok(reply) => parse_water_quality_reply(&reply),
            Err(e) => ValidationOutcome::Unavailable { reason: e.to_string() },
        }
    }

    pub async fn validate_disease(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> ValidationOutcome<DiseaseValidation> {
        match self.request(prompt, cancel).await {
            Ok(reply) => parse_disease_reply(&reply),
            Err(e) => ValidationOutcome::Unavailable { reason: e.to_string() },
        }
    }

    /// Generate text with per-attempt timeout, backoff, and cancellation
    pub async fn request(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, GenerationError> {
        if !self.generator.is_configured() {
            return Err(GenerationError::NotConfigured);
        }

        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                r = tokio::time::timeout(self.retry.attempt_timeout, self.generator.generate(prompt)) => {
                    r.unwrap_or(Err(GenerationError::Timeout))
                }
            };

            let error = match result {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(backend = self.generator.name(), attempt, "Generation succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                tracing::warn!(
                    backend = self.generator.name(),
                    attempt,
                    error = %error,
                    "Generation failed with non-retryable error"
                );
                return Err(error);
            }
            if attempt >= max_attempts {
                tracing::warn!(
                    backend = self.generator.name(),
                    attempts = attempt,
                    error = %error,
                    "Generation failed after all attempts"
                );
                return Err(error);
            }

            let delay = self.retry.backoff_for(attempt);
            tracing::warn!(
                backend = self.generator.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Generation failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
