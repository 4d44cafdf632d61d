//! Model capabilities: loaded once at startup, then shared read-only
//!
//! A capability is either ready, absent (no artifact on disk), or failed
//! (artifact present but unusable). Absent and failed models disable their
//! classifier path; the service keeps running on validation alone.

use super::{InferencePool, ModelLoadError, RandomForest};
use crate::config::ModelSettings;
use crate::disease::DiseaseModel;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum ModelCapability<M> {
    Ready(Arc<M>),
    Absent { path: PathBuf },
    Failed { path: PathBuf, reason: String },
}

impl<M> ModelCapability<M> {
    /// Run `loader` once and log the outcome
    pub fn load<F>(name: &str, path: &Path, loader: F) -> Self
    where
        F: FnOnce(&Path) -> Result<M, ModelLoadError>,
    {
        match loader(path) {
            Ok(model) => {
                tracing::info!(model = name, path = %path.display(), "Model loaded");
                ModelCapability::Ready(Arc::new(model))
            }
            Err(ModelLoadError::NotFound(_)) => {
                tracing::warn!(
                    model = name,
                    path = %path.display(),
                    "Model artifact not found; classifier disabled"
                );
                ModelCapability::Absent {
                    path: path.to_path_buf(),
                }
            }
            Err(e) => {
                tracing::error!(
                    model = name,
                    path = %path.display(),
                    error = %e,
                    "Model failed to load; classifier disabled"
                );
                ModelCapability::Failed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn ready(model: M) -> Self {
        ModelCapability::Ready(Arc::new(model))
    }

    pub fn absent() -> Self {
        ModelCapability::Absent {
            path: PathBuf::new(),
        }
    }

    pub fn model(&self) -> Option<&Arc<M>> {
        match self {
            ModelCapability::Ready(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelCapability::Ready(_))
    }

    pub fn status(&self) -> CapabilityStatus {
        match self {
            ModelCapability::Ready(_) => CapabilityStatus {
                state: "ready",
                reason: None,
            },
            ModelCapability::Absent { path } => CapabilityStatus {
                state: "absent",
                reason: Some(format!("no artifact at {}", path.display())),
            },
            ModelCapability::Failed { reason, .. } => CapabilityStatus {
                state: "failed",
                reason: Some(reason.clone()),
            },
        }
    }
}

/// Health-report view of a capability
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityStatus {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Every model the service may use, plus the pool they run on
#[derive(Debug)]
pub struct Capabilities {
    pub water_quality: ModelCapability<RandomForest>,
    pub disease: ModelCapability<DiseaseModel>,
    pub pool: InferencePool,
}

impl Capabilities {
    pub fn new(
        water_quality: ModelCapability<RandomForest>,
        disease: ModelCapability<DiseaseModel>,
        pool: InferencePool,
    ) -> Self {
        Self {
            water_quality,
            disease,
            pool,
        }
    }

    /// Load every configured artifact; never fails
    pub fn load(settings: &ModelSettings) -> Self {
        let pool = match settings.inference_workers {
            Some(n) => InferencePool::new(n),
            None => InferencePool::with_default_size(),
        };
        tracing::info!(workers = pool.workers(), "Inference pool ready");

        Self::new(
            ModelCapability::load("water_quality", &settings.water_quality_path, RandomForest::load),
            ModelCapability::load("disease", &settings.disease_path, DiseaseModel::load),
            pool,
        )
    }

    /// No models at all
    pub fn disabled() -> Self {
        Self::new(ModelCapability::absent(), ModelCapability::absent(), InferencePool::new(1))
    }
}
