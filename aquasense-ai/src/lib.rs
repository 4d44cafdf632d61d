//! aquasense-ai library interface
//!
//! Analysis fusion engine: a statistical water-quality classifier and an
//! image disease classifier, reviewed by a generative validator and fused
//! into one bounded assessment per request.

pub mod api;
pub mod classifier;
pub mod config;
pub mod disease;
pub mod error;
pub mod features;
pub mod fusion;
pub mod orchestrator;
pub mod session;
pub mod tank_data;
pub mod types;
pub mod validation;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use orchestrator::AnalysisOrchestrator;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last analysis failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self {
            orchestrator,
            startup_time: aquasense_common::time::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_image_bytes = state.orchestrator.settings().max_image_bytes;

    Router::new()
        .merge(api::analysis_routes(max_image_bytes))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
