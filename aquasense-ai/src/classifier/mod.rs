//! Statistical classifiers and their runtime capability
//!
//! - [`forest`]: tree-ensemble water-quality classifier over a [`crate::features::FeatureVector`]
//! - [`capability`]: load-once model handles with explicit missing/failed states
//! - [`pool`]: bounded blocking-thread pool for CPU-bound inference

pub mod capability;
pub mod forest;
pub mod pool;

pub use capability::{Capabilities, CapabilityStatus, ModelCapability};
pub use forest::{ForestArtifact, RandomForest, TreeArrays};
pub use pool::InferencePool;

use thiserror::Error;

/// Model artifact loading errors
///
/// A failed load disables the capability; it never aborts startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// Artifact file does not exist
    #[error("Model artifact not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("Model artifact read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Wrong artifact format or unsupported version
    #[error("Unsupported model artifact: {0}")]
    Unsupported(String),

    /// Structurally inconsistent artifact
    #[error("Invalid model artifact: {0}")]
    Invalid(String),
}

/// Inference errors
///
/// The orchestrator treats every variant as "no classifier result".
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Malformed model input: {0}")]
    MalformedInput(String),

    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),

    /// Blocking worker panicked or was cancelled
    #[error("Inference worker failed: {0}")]
    WorkerFailed(String),

    #[error("Inference pool is closed")]
    PoolClosed,
}
