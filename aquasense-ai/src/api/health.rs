//! Health check endpoint
//!
//! Reports uptime, model availability and whether validation is configured.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::classifier::CapabilityStatus;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "ok" when both signal sources can run, otherwise "degraded"
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub models: ModelsHealth,
    pub validation: ValidationHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsHealth {
    pub water_quality: CapabilityStatus,
    pub disease: CapabilityStatus,
    pub inference_workers: usize,
}

#[derive(Debug, Serialize)]
pub struct ValidationHealth {
    pub backend: &'static str,
    pub configured: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    let capabilities = orchestrator.capabilities();
    let configured = orchestrator.validator_configured();

    let status = if capabilities.water_quality.is_ready() && configured {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "aquasense-ai".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: aquasense_common::time::seconds_since(state.startup_time),
        models: ModelsHealth {
            water_quality: capabilities.water_quality.status(),
            disease: capabilities.disease.status(),
            inference_workers: capabilities.pool.workers(),
        },
        validation: ValidationHealth {
            backend: orchestrator.validator_backend(),
            configured,
        },
        last_error: state.last_error.read().await.clone(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
