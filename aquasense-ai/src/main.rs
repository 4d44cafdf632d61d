//! aquasense-ai - Analysis Fusion microservice
//!
//! **Module Identity:**
//! - Name: aquasense-ai (Analysis Fusion)
//! - Default bind: 0.0.0.0:8000
//!
//! Serves water-quality and disease analyses that fuse on-device classifiers
//! with a generative validation review.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use aquasense_ai::classifier::Capabilities;
use aquasense_ai::config::{resolve_gemini_api_key, ServiceConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use aquasense_ai::orchestrator::AnalysisOrchestrator;
use aquasense_ai::tank_data::SqliteTankData;
use aquasense_ai::validation::{GeminiClient, ValidationClient};
use aquasense_ai::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(name = "aquasense-ai", version, about = "AquaSense analysis fusion service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Resolve and load configuration
    let config_path = aquasense_common::config::resolve_config_path(
        args.config.as_deref(),
        CONFIG_ENV_VAR,
        CONFIG_FILE_NAME,
    );
    let config: ServiceConfig = aquasense_common::config::load_toml_config(config_path.as_deref())?;

    // Step 2: Logging
    aquasense_common::config::init_tracing(&config.logging, "aquasense_ai")?;

    info!("Starting aquasense-ai (Analysis Fusion) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    // Step 3: Models (absent or broken artifacts disable their classifier, never the service)
    let capabilities = Arc::new(Capabilities::load(&config.models));

    // Step 4: Generative validation
    let api_key = resolve_gemini_api_key(&config.generative);
    let gemini = GeminiClient::new(&config.generative, api_key).context("Failed to build Gemini client")?;
    let validator = ValidationClient::new(Arc::new(gemini), config.analysis.retry_policy());

    // Step 5: Tank data
    info!("Database: {}", config.database_path.display());
    let tank_data = SqliteTankData::connect(&config.database_path).await?;

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        capabilities,
        Arc::new(tank_data),
        validator,
        config.policy.clone(),
        config.analysis.clone(),
    ));

    // Expired conversation sessions are swept periodically
    let sessions = orchestrator.sessions().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup_expired().await;
        }
    });

    let app = aquasense_ai::build_router(AppState::new(orchestrator));

    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("aquasense-ai stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
