//! Configuration for aquasense-ai
//!
//! Loaded from TOML (see [`aquasense_common::config::resolve_config_path`]);
//! every field has a default so an absent file yields a runnable service.
//! The Gemini API key resolves ENV → TOML.

use crate::fusion::FusionPolicy;
use crate::validation::RetryPolicy;
use aquasense_common::config::LoggingConfig;
use aquasense_common::time::millis_to_duration;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "AQUASENSE_CONFIG";
/// File name looked up in the per-user config directory
pub const CONFIG_FILE_NAME: &str = "aquasense-ai.toml";
/// Environment variable holding the Gemini API key
pub const API_KEY_ENV_VAR: &str = "AQUASENSE_GEMINI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database holding tanks and readings
    pub database_path: PathBuf,
    pub logging: LoggingConfig,
    pub models: ModelSettings,
    pub generative: GenerativeSettings,
    pub analysis: AnalysisSettings,
    pub policy: FusionPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("aquasense.db"),
            logging: LoggingConfig::default(),
            models: ModelSettings::default(),
            generative: GenerativeSettings::default(),
            analysis: AnalysisSettings::default(),
            policy: FusionPolicy::default(),
        }
    }
}

/// `[models]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub water_quality_path: PathBuf,
    pub disease_path: PathBuf,
    /// Concurrent inference jobs; defaults to available parallelism
    pub inference_workers: Option<usize>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            water_quality_path: PathBuf::from("models/water_quality_forest.json"),
            disease_path: PathBuf::from("models/fish_disease_model.json"),
            inference_workers: None,
        }
    }
}

/// `[generative]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerativeSettings {
    /// Lower priority than the environment variable
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub requests_per_minute: u32,
}

impl Default for GenerativeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.7,
            max_output_tokens: 8192,
            requests_per_minute: 60,
        }
    }
}

/// `[analysis]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Overall per-request budget
    pub deadline_ms: u64,
    pub attempt_timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub max_context_turns: usize,
    pub max_image_bytes: usize,
    pub session_max_history: usize,
    pub session_expiry_minutes: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            deadline_ms: 45_000,
            attempt_timeout_ms: 12_000,
            max_retries: 2,
            backoff_base_ms: 1_000,
            max_context_turns: 10,
            max_image_bytes: 10 * 1024 * 1024,
            session_max_history: 50,
            session_expiry_minutes: 60,
        }
    }
}

impl AnalysisSettings {
    pub fn deadline(&self) -> Duration {
        millis_to_duration(self.deadline_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            attempt_timeout: millis_to_duration(self.attempt_timeout_ms),
            backoff_base: millis_to_duration(self.backoff_base_ms),
        }
    }
}

/// Resolve the Gemini API key
///
/// **Priority:** ENV → TOML. Returns `None` when neither holds a usable key;
/// the service then runs with validation disabled.
pub fn resolve_gemini_api_key(settings: &GenerativeSettings) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok().filter(|k| is_valid_key(k));
    let toml_key = settings.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Gemini API key found in both environment and TOML; using environment");
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Gemini API key not configured (set {} or [generative].api_key); validation disabled",
        API_KEY_ENV_VAR
    );
    None
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
