//! Analysis orchestration
//!
//! One request flows: tank data → bounds check → feature vector → classifier
//! (best effort, on the inference pool) → validation prompt → validation call
//! → fusion → session summary. Every stage that can wait runs under the
//! request deadline and the caller's cancellation token.
//!
//! Either signal may be missing. The request only fails when both are, or
//! when the input itself is unusable.

use crate::classifier::Capabilities;
use crate::config::AnalysisSettings;
use crate::disease::{fuse_disease, image_id, select_candidates, DiseaseDetectionResult};
use crate::error::AnalysisError;
use crate::features::FeatureVector;
use crate::fusion::{FusedAnalysis, FusionError, FusionPolicy};
use crate::session::{ConversationTurn, SessionMemory, TurnRole};
use crate::tank_data::{TankDataError, TankDataSource};
use crate::types::{ClassifierPrediction, DiseaseCandidate};
use crate::validation::composer::{DiseasePrompt, WaterQualityPrompt, MAX_CONTEXT_TURNS};
use crate::validation::{ValidationClient, ValidationOutcome};
use aquasense_common::MeasuredReading;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Water-quality analysis request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TankAnalysisRequest {
    #[serde(default)]
    pub tank_id: String,
    /// Empty means "use the tank's registered species"
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Disease screening request (image already decoded from transport encoding)
#[derive(Debug, Clone, Default)]
pub struct DiseaseDetectionRequest {
    pub image_bytes: Vec<u8>,
    pub tank_id: Option<String>,
    pub symptom_text: Option<String>,
    pub session_id: Option<String>,
}

pub struct AnalysisOrchestrator {
    capabilities: Arc<Capabilities>,
    tank_data: Arc<dyn TankDataSource>,
    validator: ValidationClient,
    sessions: SessionMemory,
    policy: FusionPolicy,
    settings: AnalysisSettings,
}

impl AnalysisOrchestrator {
    pub fn new(
        capabilities: Arc<Capabilities>,
        tank_data: Arc<dyn TankDataSource>,
        validator: ValidationClient,
        policy: FusionPolicy,
        settings: AnalysisSettings,
    ) -> Self {
        let sessions = SessionMemory::new(
            settings.session_max_history,
            chrono::Duration::minutes(settings.session_expiry_minutes),
        );
        Self {
            capabilities,
            tank_data,
            validator,
            sessions,
            policy,
            settings,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn validator_configured(&self) -> bool {
        self.validator.is_configured()
    }

    pub fn validator_backend(&self) -> &'static str {
        self.validator.backend()
    }

    pub fn sessions(&self) -> &SessionMemory {
        &self.sessions
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Assess a tank's latest water-quality reading
    pub async fn analyze_tank(
        &self,
        request: TankAnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<FusedAnalysis, AnalysisError> {
        let span = tracing::info_span!(
            "analyze_tank",
            request_id = %Uuid::new_v4(),
            tank_id = %request.tank_id.trim()
        );
        self.run_tank_analysis(request, cancel).instrument(span).await
    }

    async fn run_tank_analysis(
        &self,
        request: TankAnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<FusedAnalysis, AnalysisError> {
        let started = Instant::now();
        let deadline = started + self.settings.deadline();

        let tank_id = request.tank_id.trim();
        if tank_id.is_empty() {
            return Err(AnalysisError::input("tankId", "must not be empty"));
        }

        let loading = async {
            let profile = self.tank_data.tank(tank_id).await?;
            let reading = self.tank_data.latest_reading(tank_id).await?;
            Ok::<_, TankDataError>((profile, reading))
        };
        let (profile, reading) = stage(deadline, &cancel, loading)
            .await
            .map_err(|i| i.into_error("loading tank data"))?
            .map_err(tank_error)?;
        reading
            .validate_bounds()
            .map_err(|v| AnalysisError::input(v.field(), v.to_string()))?;

        let species = if request.species.iter().any(|s| !s.trim().is_empty()) {
            request.species
        } else {
            profile.species
        };

        let vector = FeatureVector::build(&reading);
        debug!(
            measured = vector.measured_count(),
            defaulted = vector.defaulted_parameters().len(),
            "Feature vector built"
        );

        let prediction = match stage(deadline, &cancel, self.classify_water(&vector)).await {
            Ok(prediction) => prediction,
            Err(Interrupted::Cancelled) => return Err(AnalysisError::Cancelled),
            Err(Interrupted::Deadline) => {
                warn!("Analysis deadline reached before the water quality classifier finished");
                None
            }
        };
        let context = self.context_for(request.session_id.as_deref()).await;

        let prompt = WaterQualityPrompt {
            reading: &reading,
            vector: &vector,
            prediction: prediction.as_ref(),
            species: &species,
            context: &context,
        }
        .render();

        let outcome = self
            .within_deadline(deadline, &cancel, |token| async move {
                self.validator.validate_water_quality(&prompt, &token).await
            })
            .await;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let (validation, unavailable_reason) = log_outcome(outcome);

        let analysis = self
            .policy
            .fuse(tank_id, prediction.as_ref(), validation.as_ref())
            .map_err(|e| fusion_error(e, unavailable_reason))?;

        if let Some(session_id) = request.session_id.as_deref() {
            self.sessions
                .add_turn(session_id, TurnRole::User, format!("Analyze water quality for tank {}", tank_id))
                .await;
            self.sessions
                .add_turn(
                    session_id,
                    TurnRole::Assistant,
                    format!(
                        "Tank {}: {} ({}/100). {}",
                        tank_id,
                        analysis.status,
                        analysis.health_score,
                        first_sentence(&analysis.narrative)
                    ),
                )
                .await;
        }

        info!(
            status = %analysis.status,
            health_score = analysis.health_score,
            ml_enabled = analysis.ml_enabled,
            validation = ?analysis.validation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tank analysis complete"
        );
        Ok(analysis)
    }

    /// Screen a fish photo for disease
    pub async fn detect_disease(
        &self,
        request: DiseaseDetectionRequest,
        cancel: CancellationToken,
    ) -> Result<DiseaseDetectionResult, AnalysisError> {
        let span = tracing::info_span!("detect_disease", request_id = %Uuid::new_v4());
        self.run_disease_detection(request, cancel).instrument(span).await
    }

    async fn run_disease_detection(
        &self,
        request: DiseaseDetectionRequest,
        cancel: CancellationToken,
    ) -> Result<DiseaseDetectionResult, AnalysisError> {
        let started = Instant::now();
        let deadline = started + self.settings.deadline();

        if request.image_bytes.is_empty() {
            return Err(AnalysisError::input("imageBase64", "image is empty"));
        }
        if request.image_bytes.len() > self.settings.max_image_bytes {
            return Err(AnalysisError::input(
                "imageBase64",
                format!("image exceeds {} bytes", self.settings.max_image_bytes),
            ));
        }

        let tank_id = non_blank(request.tank_id);
        let symptom_text = non_blank(request.symptom_text);

        let reading = match tank_id.as_deref() {
            Some(id) => match stage(deadline, &cancel, self.optional_reading(id)).await {
                Ok(reading) => reading?,
                Err(Interrupted::Cancelled) => return Err(AnalysisError::Cancelled),
                Err(Interrupted::Deadline) => {
                    warn!("Analysis deadline reached while loading tank data, screening without water context");
                    None
                }
            },
            None => None,
        };

        let id = image_id(&request.image_bytes);
        debug!(image_id = %id, bytes = request.image_bytes.len(), "Image received");

        let candidates = match stage(deadline, &cancel, self.classify_image(request.image_bytes)).await {
            Ok(candidates) => candidates,
            Err(Interrupted::Cancelled) => return Err(AnalysisError::Cancelled),
            Err(Interrupted::Deadline) => {
                warn!("Analysis deadline reached before the disease classifier finished");
                None
            }
        };
        let context = self.context_for(request.session_id.as_deref()).await;

        let prompt = DiseasePrompt {
            candidates: candidates.as_deref(),
            symptom_text: symptom_text.as_deref(),
            reading: reading.as_ref(),
            context: &context,
        }
        .render();

        let outcome = self
            .within_deadline(deadline, &cancel, |token| async move {
                self.validator.validate_disease(&prompt, &token).await
            })
            .await;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let (validation, unavailable_reason) = log_outcome(outcome);

        let result = fuse_disease(id, tank_id, candidates, validation, &self.policy)
            .map_err(|e| fusion_error(e, unavailable_reason))?;

        if let Some(session_id) = request.session_id.as_deref() {
            let asked = match symptom_text.as_deref() {
                Some(symptoms) => format!("Check a fish photo for disease. Observed: {}", symptoms),
                None => "Check a fish photo for disease".to_string(),
            };
            let top = result
                .candidates
                .first()
                .map(|c| c.name.as_str())
                .unwrap_or("no confident finding");
            self.sessions.add_turn(session_id, TurnRole::User, asked).await;
            self.sessions
                .add_turn(
                    session_id,
                    TurnRole::Assistant,
                    format!("Disease screening: {} (severity {}).", top, result.severity),
                )
                .await;
        }

        info!(
            image_id = %result.image_id,
            severity = %result.severity,
            urgent = result.urgent_action_required,
            candidates = result.candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Disease detection complete"
        );
        Ok(result)
    }

    /// Run the water-quality classifier if it loaded; failures degrade to `None`
    async fn classify_water(&self, vector: &FeatureVector) -> Option<ClassifierPrediction> {
        let forest = Arc::clone(self.capabilities.water_quality.model()?);
        let vector = vector.clone();

        match self.capabilities.pool.run(move || forest.predict(&vector)).await {
            Ok(prediction) => {
                debug!(
                    label = %prediction.label,
                    confidence = prediction.confidence,
                    "Classifier prediction"
                );
                Some(prediction)
            }
            Err(e) => {
                warn!(error = %e, "Water quality classifier failed, continuing without it");
                None
            }
        }
    }

    /// `None` when the image model is absent or could not read the image
    async fn classify_image(&self, image_bytes: Vec<u8>) -> Option<Vec<DiseaseCandidate>> {
        let model = Arc::clone(self.capabilities.disease.model()?);

        match self.capabilities.pool.run(move || model.predict(&image_bytes)).await {
            Ok(scored) => Some(select_candidates(&scored, &self.policy)),
            Err(e) => {
                warn!(error = %e, "Disease classifier failed, continuing without it");
                None
            }
        }
    }

    /// Latest reading as extra context; a tank without readings is fine
    async fn optional_reading(&self, tank_id: &str) -> Result<Option<MeasuredReading>, AnalysisError> {
        match self.tank_data.latest_reading(tank_id).await {
            Ok(reading) => Ok(Some(reading)),
            Err(TankDataError::NoReadings(_)) => Ok(None),
            Err(TankDataError::TankNotFound(id)) => Err(AnalysisError::TankNotFound(id)),
            Err(e) => {
                warn!(error = %e, "Tank data unavailable, screening without water context");
                Ok(None)
            }
        }
    }

    async fn context_for(&self, session_id: Option<&str>) -> Vec<ConversationTurn> {
        match session_id {
            Some(id) => {
                let limit = self.settings.max_context_turns.min(MAX_CONTEXT_TURNS);
                self.sessions.recent(id, limit).await
            }
            None => Vec::new(),
        }
    }

    /// Run a validation call until it finishes, the deadline passes, or the caller goes away
    ///
    /// The call gets a child token so that hitting the deadline also stops
    /// any pending retry.
    async fn within_deadline<T, F, Fut>(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
        call: F,
    ) -> ValidationOutcome<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ValidationOutcome<T>>,
    {
        let token = cancel.child_token();
        let call = call(token.clone());

        tokio::select! {
            outcome = call => outcome,
            _ = tokio::time::sleep_until(deadline) => {
                token.cancel();
                warn!("Analysis deadline reached before validation finished");
                ValidationOutcome::Unavailable {
                    reason: "analysis deadline exceeded".to_string(),
                }
            }
        }
    }
}

/// Why a stage stopped before finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    Deadline,
    Cancelled,
}

impl Interrupted {
    fn into_error(self, doing: &str) -> AnalysisError {
        match self {
            Interrupted::Cancelled => AnalysisError::Cancelled,
            Interrupted::Deadline => {
                AnalysisError::unavailable(format!("analysis deadline exceeded while {}", doing))
            }
        }
    }
}

/// Await one stage of a request, giving up at the deadline or on cancellation
///
/// Cancellation wins when both are ready.
async fn stage<T>(
    deadline: Instant,
    cancel: &CancellationToken,
    work: impl Future<Output = T>,
) -> Result<T, Interrupted> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
        result = tokio::time::timeout_at(deadline, work) => result.map_err(|_| Interrupted::Deadline),
    }
}

fn tank_error(err: TankDataError) -> AnalysisError {
    match err {
        TankDataError::TankNotFound(id) => AnalysisError::TankNotFound(id),
        TankDataError::NoReadings(_) => AnalysisError::input("tankId", "tank has no water quality readings"),
        TankDataError::Backend(reason) => AnalysisError::unavailable(format!("tank data unavailable: {}", reason)),
    }
}

fn fusion_error(err: FusionError, validation_reason: Option<String>) -> AnalysisError {
    let reason = match validation_reason {
        Some(why) => format!("{} (validation: {})", err, why),
        None => err.to_string(),
    };
    AnalysisError::unavailable(reason)
}

/// Split an outcome into the usable result and, if there is none, why
fn log_outcome<T>(outcome: ValidationOutcome<T>) -> (Option<T>, Option<String>) {
    match outcome {
        ValidationOutcome::Complete(v) => (Some(v), None),
        ValidationOutcome::Degraded(v) => {
            warn!("Validation reply could not be fully parsed, using it as narrative only");
            (Some(v), None)
        }
        ValidationOutcome::Unavailable { reason } => {
            warn!(reason = %reason, "Validation unavailable");
            (None, Some(reason))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    match text.find(". ") {
        Some(end) => &text[..=end],
        None => text,
    }
}
