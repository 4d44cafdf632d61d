//! Generative validation
//!
//! A text generator (Gemini in production) reviews the measured parameters
//! and the classifier's signal. Its reply is parsed field by field; a reply
//! that cannot be parsed is kept as a degraded narrative rather than dropped.
//!
//! - [`composer`]: prompt construction
//! - [`client`]: retry/timeout/cancellation around a [`TextGenerator`]
//! - [`gemini`]: Gemini `generateContent` backend
//! - [`parser`]: reply parsing

pub mod client;
pub mod composer;
pub mod gemini;
pub mod parser;

pub use client::{RetryPolicy, ValidationClient};
pub use gemini::GeminiClient;

use crate::types::{DiseaseCandidate, DiseaseSeverity, HealthStatus};
use async_trait::async_trait;
use thiserror::Error;

/// Text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// False when the backend cannot possibly succeed (e.g. no API key)
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Text-generation failures
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generative service is not configured (missing API key)")]
    NotConfigured,

    #[error("Generation attempt timed out")]
    Timeout,

    #[error("Generative service quota exhausted: {0}")]
    Quota(String),

    /// Non-success HTTP status other than 429
    #[error("Generative service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generative service returned no text: {0}")]
    EmptyReply(String),

    #[error("Generative service response could not be decoded: {0}")]
    Decode(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout | GenerationError::Quota(_) | GenerationError::Network(_) => true,
            GenerationError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result of validating a water-quality assessment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub narrative: String,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// 0-100; `None` when the reply had no usable score
    pub health_score: Option<u8>,
    /// Severity the reply implies (explicit status or critical warnings)
    pub implied_status: Option<HealthStatus>,
    /// Reply could not be parsed into fields; `narrative` holds the raw text
    pub degraded: bool,
}

/// Result of validating a disease detection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiseaseValidation {
    pub narrative: String,
    pub diseases: Vec<DiseaseCandidate>,
    pub causes: Vec<String>,
    pub symptoms: Vec<String>,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
    pub urgency: Option<DiseaseSeverity>,
    pub degraded: bool,
}

impl DiseaseValidation {
    /// Reply flags the case as needing prompt action
    pub fn is_urgent(&self) -> bool {
        self.urgency.map_or(false, |u| u >= DiseaseSeverity::High)
    }
}

/// Outcome of a validation call
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome<T> {
    /// Reply parsed into fields
    Complete(T),
    /// Reply received but only partly usable
    Degraded(T),
    /// No usable reply
    Unavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GenerationError::Timeout.is_retryable());
        assert!(GenerationError::Quota("429".into()).is_retryable());
        assert!(GenerationError::Status { status: 503, message: String::new() }.is_retryable());
        assert!(!GenerationError::NotConfigured.is_retryable());
        assert!(!GenerationError::Status { status: 400, message: String::new() }.is_retryable());
        assert!(!GenerationError::Decode("eof".into()).is_retryable());
        assert!(!GenerationError::Cancelled.is_retryable());
    }

    #[test]
    fn test_disease_urgency() {
        let mut v = DiseaseValidation::default();
        assert!(!v.is_urgent());
        v.urgency = Some(DiseaseSeverity::Medium);
        assert!(!v.is_urgent());
        v.urgency = Some(DiseaseSeverity::High);
        assert!(v.is_urgent());
    }
}
