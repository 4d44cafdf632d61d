//! Image disease classifier: softmax over normalized RGB pixels
//!
//! Images are decoded, resized to `input_size x input_size` and flattened
//! row-major as interleaved RGB in [0, 1]. Each class has one weight row of
//! length `3 * input_size^2` plus a bias.

use super::catalog::DEFAULT_LABELS;
use crate::classifier::{InferenceError, ModelLoadError};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DISEASE_FORMAT: &str = "aquasense-disease-linear";
pub const DISEASE_VERSION: u32 = 1;

const MAX_INPUT_SIZE: u32 = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseArtifact {
    pub format: String,
    pub version: u32,
    pub input_size: u32,
    /// Class labels in output order; empty means the standard seven
    #[serde(default)]
    pub labels: Vec<String>,
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct DiseaseModel {
    input_size: u32,
    labels: Vec<String>,
    weights: Vec<Vec<f32>>,
    biases: Vec<f32>,
}

impl DiseaseModel {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_artifact(serde_json::from_str(&content)?)
    }

    pub fn from_artifact(artifact: DiseaseArtifact) -> Result<Self, ModelLoadError> {
        if artifact.format != DISEASE_FORMAT {
            return Err(ModelLoadError::Unsupported(format!(
                "format '{}', expected '{}'",
                artifact.format, DISEASE_FORMAT
            )));
        }
        if artifact.version == 0 || artifact.version > DISEASE_VERSION {
            return Err(ModelLoadError::Unsupported(format!(
                "version {}, this build reads up to {}",
                artifact.version, DISEASE_VERSION
            )));
        }
        if artifact.input_size == 0 || artifact.input_size > MAX_INPUT_SIZE {
            return Err(ModelLoadError::Invalid(format!(
                "input size {} outside 1..={}",
                artifact.input_size, MAX_INPUT_SIZE
            )));
        }

        let labels = if artifact.labels.is_empty() {
            DEFAULT_LABELS.iter().map(|l| l.to_string()).collect()
        } else {
            artifact.labels
        };

        let width = 3 * (artifact.input_size as usize).pow(2);
        if artifact.weights.len() != labels.len() || artifact.biases.len() != labels.len() {
            return Err(ModelLoadError::Invalid(format!(
                "{} labels but {} weight rows and {} biases",
                labels.len(),
                artifact.weights.len(),
                artifact.biases.len()
            )));
        }
        if let Some(row) = artifact.weights.iter().position(|w| w.len() != width) {
            return Err(ModelLoadError::Invalid(format!(
                "weight row {} has length {}, expected {}",
                row,
                artifact.weights[row].len(),
                width
            )));
        }

        Ok(Self {
            input_size: artifact.input_size,
            labels,
            weights: artifact.weights,
            biases: artifact.biases,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Decode and resize an image into the model's input layout
    pub fn preprocess(&self, image_bytes: &[u8]) -> Result<Vec<f32>, InferenceError> {
        let decoded = image::load_from_memory(image_bytes)
            .map_err(|e| InferenceError::ImageDecode(e.to_string()))?;
        let rgb = decoded
            .resize_exact(self.input_size, self.input_size, FilterType::Triangle)
            .to_rgb8();

        Ok(rgb
            .pixels()
            .flat_map(|p| p.0)
            .map(|c| f32::from(c) / 255.0)
            .collect())
    }

    /// Per-label probabilities, most likely first
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Vec<(String, f64)>, InferenceError> {
        let input = self.preprocess(image_bytes)?;

        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| {
                let dot: f32 = w.iter().zip(&input).map(|(a, x)| a * x).sum();
                f64::from(dot + b)
            })
            .collect();

        let mut scored: Vec<(String, f64)> = self
            .labels
            .iter()
            .cloned()
            .zip(softmax(&logits))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scored)
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
