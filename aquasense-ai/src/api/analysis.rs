//! Analysis API handlers
//!
//! POST /api/v1/analysis/tank
//! POST /api/v1/analysis/disease
//!
//! Each handler holds a drop guard on the request's cancellation token: when
//! the client disconnects, axum drops the handler future and any in-flight
//! validation retries stop.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{
    disease::DiseaseDetectionResult,
    error::{AnalysisError, ApiError, ApiResult},
    fusion::FusedAnalysis,
    orchestrator::{DiseaseDetectionRequest, TankAnalysisRequest},
    AppState,
};

/// Request body slack on top of the encoded image
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Body of POST /api/v1/analysis/disease
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseDetectionBody {
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub tank_id: Option<String>,
    #[serde(default)]
    pub symptom_text: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /api/v1/analysis/tank
pub async fn analyze_tank(
    State(state): State<AppState>,
    payload: Result<Json<TankAnalysisRequest>, JsonRejection>,
) -> ApiResult<Json<FusedAnalysis>> {
    let Json(request) = payload?;
    tracing::info!(tank_id = %request.tank_id, species = request.species.len(), "Tank analysis request");

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.orchestrator.analyze_tank(request, cancel).await {
        Ok(analysis) => Ok(Json(analysis)),
        Err(e) => Err(report(&state, e).await),
    }
}

/// POST /api/v1/analysis/disease
pub async fn detect_disease(
    State(state): State<AppState>,
    payload: Result<Json<DiseaseDetectionBody>, JsonRejection>,
) -> ApiResult<Json<DiseaseDetectionResult>> {
    let Json(body) = payload?;
    let image_bytes = decode_image(&body.image_base64)?;
    tracing::info!(
        bytes = image_bytes.len(),
        tank_id = body.tank_id.as_deref().unwrap_or("-"),
        "Disease detection request"
    );

    let request = DiseaseDetectionRequest {
        image_bytes,
        tank_id: body.tank_id,
        symptom_text: body.symptom_text,
        session_id: body.session_id,
    };

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.orchestrator.detect_disease(request, cancel).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => Err(report(&state, e).await),
    }
}

/// Decode standard base64, tolerating a `data:<mime>;base64,` prefix and line breaks
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if compact.is_empty() {
        return Err(AnalysisError::input("imageBase64", "image is required").into());
    }

    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AnalysisError::input("imageBase64", format!("not valid base64: {}", e)).into())
}

/// Remember service-side failures for /health, then convert
async fn report(state: &AppState, err: AnalysisError) -> ApiError {
    match &err {
        AnalysisError::AnalysisUnavailable { reason } => {
            tracing::warn!(reason = %reason, "Analysis unavailable");
            state.record_error(reason.clone()).await;
        }
        AnalysisError::Cancelled => tracing::debug!("Analysis cancelled by client"),
        other => tracing::info!(error = %other, "Analysis rejected"),
    }
    err.into()
}

/// Build analysis routes
///
/// The disease route accepts bodies large enough for a base64-encoded image
/// of `max_image_bytes`.
pub fn analysis_routes(max_image_bytes: usize) -> Router<AppState> {
    let disease_body_limit = max_image_bytes.div_ceil(3) * 4 + BODY_OVERHEAD_BYTES;

    Router::new()
        .route("/api/v1/analysis/tank", post(analyze_tank))
        .route(
            "/api/v1/analysis/disease",
            post(detect_disease).layer(DefaultBodyLimit::max(disease_body_limit)),
        )
}
