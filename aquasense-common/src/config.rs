//! Configuration file resolution, TOML loading, and logging setup

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Logging configuration (`[logging]` section)
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the configuration file path in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Per-user config directory (`<config_dir>/aquasense/<file_name>`), if it exists
///
/// Returns `None` when no source applies; callers then run on compiled defaults.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: user config directory
    dirs::config_dir()
        .map(|d| d.join("aquasense").join(file_name))
        .filter(|p| p.exists())
}

/// Load a TOML file into `T`, or `T::default()` when no path is given
///
/// An explicitly named file that is missing or malformed is an error: a typo
/// in `--config` must not silently fall back to defaults.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        tracing::info!("No configuration file found, using built-in defaults");
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read config {} failed: {}", path.display(), e))
    })?;

    let config = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Parse config {} failed: {}", path.display(), e))
    })?;

    tracing::info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Build the tracing filter directive: `RUST_LOG` wins, otherwise the configured level
pub fn filter_directive(logging: &LoggingConfig, crate_target: &str) -> String {
    match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => directive,
        _ => format!(
            "{}={},aquasense_common={},tower_http=info",
            crate_target, logging.level, logging.level
        ),
    }
}

/// Install the global tracing subscriber
pub fn init_tracing(logging: &LoggingConfig, crate_target: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_new(filter_directive(logging, crate_target))
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))
}
