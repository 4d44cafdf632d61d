// Fusion Module - classifier + validation -> one assessment
//
// Signals: statistical classifier (optional) and generative validation (optional).
// Rule: status only ever escalates toward the more severe reading; the score
// never reads healthier than the status.

use crate::types::{ClassifierPrediction, HealthStatus, QualityLabel};
use crate::validation::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Tunable constants for score mapping and disease filtering (`[policy]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionPolicy {
    /// Base score per classifier label
    pub excellent_score: f64,
    pub good_score: f64,
    pub poor_score: f64,
    /// Points by which a confident classifier moves its label's base score
    pub confidence_span: f64,

    /// Lower score bounds of the status bands
    pub excellent_min_score: u8,
    pub good_min_score: u8,
    pub attention_min_score: u8,

    /// Scores used when only a status is known
    pub attention_score: u8,
    pub critical_score: u8,

    pub disease_min_confidence: f64,
    pub healthy_min_confidence: f64,
    pub max_disease_candidates: usize,
    /// Classifier confidence at which a serious disease demands action
    pub urgent_confidence: f64,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            excellent_score: 90.0,
            good_score: 70.0,
            poor_score: 35.0,
            confidence_span: 10.0,
            excellent_min_score: 85,
            good_min_score: 65,
            attention_min_score: 30,
            attention_score: 50,
            critical_score: 25,
            disease_min_confidence: 0.2,
            healthy_min_confidence: 0.7,
            max_disease_candidates: 3,
            urgent_confidence: 0.8,
        }
    }
}

/// Status implied by a classifier label on its own
pub fn baseline_status(label: QualityLabel) -> HealthStatus {
    match label {
        QualityLabel::Excellent => HealthStatus::Excellent,
        QualityLabel::Good => HealthStatus::Good,
        QualityLabel::Poor => HealthStatus::NeedsAttention,
    }
}

/// Combine the classifier's label with a severity hint from validation
///
/// Returns the more severe of the two; a hint can never soften the label.
pub fn escalate(label: QualityLabel, hint: Option<HealthStatus>) -> HealthStatus {
    let baseline = baseline_status(label);
    match hint {
        Some(h) => baseline.max(h),
        None => baseline,
    }
}

impl FusionPolicy {
    /// 0-100 score derived from a classifier prediction
    ///
    /// Confidence above 0.5 pushes Excellent/Good up and Poor down.
    pub fn classifier_score(&self, prediction: &ClassifierPrediction) -> u8 {
        let shift = (prediction.confidence - 0.5) * self.confidence_span;
        let score = match prediction.label {
            QualityLabel::Excellent => self.excellent_score + shift,
            QualityLabel::Good => self.good_score + shift,
            QualityLabel::Poor => self.poor_score - shift,
        };
        score.round().clamp(0.0, 100.0) as u8
    }

    pub fn status_for_score(&self, score: u8) -> HealthStatus {
        if score >= self.excellent_min_score {
            HealthStatus::Excellent
        } else if score >= self.good_min_score {
            HealthStatus::Good
        } else if score >= self.attention_min_score {
            HealthStatus::NeedsAttention
        } else {
            HealthStatus::Critical
        }
    }

    /// Typical score for a status when no numeric score is available
    pub fn representative_score(&self, status: HealthStatus) -> u8 {
        match status {
            HealthStatus::Excellent => self.excellent_score.round().clamp(0.0, 100.0) as u8,
            HealthStatus::Good => self.good_score.round().clamp(0.0, 100.0) as u8,
            HealthStatus::NeedsAttention => self.attention_score,
            HealthStatus::Critical => self.critical_score,
        }
    }

    /// Highest score compatible with a status
    ///
    /// Applies only to derived scores; a score stated by validation is kept as given.
    fn score_ceiling(&self, status: HealthStatus) -> u8 {
        match status {
            HealthStatus::Excellent => 100,
            HealthStatus::Good => self.excellent_min_score.saturating_sub(1),
            HealthStatus::NeedsAttention => self.good_min_score.saturating_sub(1),
            HealthStatus::Critical => self.attention_min_score.saturating_sub(1),
        }
    }

    /// Fuse whichever signals are present into one assessment
    ///
    /// Fails only when there is nothing to base an assessment on.
    pub fn fuse(
        &self,
        tank_id: &str,
        prediction: Option<&ClassifierPrediction>,
        validation: Option<&ValidationResult>,
    ) -> Result<FusedAnalysis, FusionError> {
        let validation_score = validation.and_then(|v| v.health_score).filter(|s| *s <= 100);

        let (score, status, narrative) = match (prediction, validation) {
            (Some(p), Some(v)) => {
                let score = validation_score.unwrap_or_else(|| self.classifier_score(p));
                let hint = v.implied_status.max(validation_score.map(|s| self.status_for_score(s)));
                let narrative = if v.narrative.trim().is_empty() {
                    classifier_narrative(p, false)
                } else {
                    v.narrative.trim().to_string()
                };
                (score, escalate(p.label, hint), narrative)
            }
            (Some(p), None) => (
                self.classifier_score(p),
                baseline_status(p.label),
                classifier_narrative(p, true),
            ),
            (None, Some(v)) => {
                let score = validation_score
                    .or_else(|| v.implied_status.map(|s| self.representative_score(s)))
                    .ok_or(FusionError::InsufficientValidation)?;
                let status = self.status_for_score(score).max(v.implied_status.unwrap_or(HealthStatus::Excellent));
                let narrative = if v.narrative.trim().is_empty() {
                    format!("Water quality assessed as {} from the validation review.", status)
                } else {
                    v.narrative.trim().to_string()
                };
                (score, status, narrative)
            }
            (None, None) => return Err(FusionError::NoSignals),
        };

        let mut warnings: Vec<String> = validation.map(|v| v.warnings.clone()).unwrap_or_default();
        if let Some(p) = prediction.filter(|p| p.label == QualityLabel::Poor) {
            warnings.push(format!(
                "Statistical classifier rates water quality as Poor ({:.0}% confidence)",
                p.confidence * 100.0
            ));
        }
        let recommendations = validation.map(|v| v.recommendations.clone()).unwrap_or_default();
        let health_score = match validation_score {
            Some(stated) => stated,
            None => score.min(self.score_ceiling(status)),
        };

        Ok(FusedAnalysis {
            tank_id: tank_id.to_string(),
            health_score,
            status,
            narrative,
            warnings: dedup_case_insensitive(warnings),
            recommendations: dedup_case_insensitive(recommendations),
            ml_enabled: prediction.is_some(),
            ml_prediction: prediction.cloned(),
            validation: match validation {
                None => ValidationState::Unavailable,
                Some(v) if v.degraded => ValidationState::Degraded,
                Some(_) => ValidationState::Complete,
            },
            timestamp: Utc::now(),
        })
    }
}

fn classifier_narrative(prediction: &ClassifierPrediction, validation_missing: bool) -> String {
    let mut text = format!(
        "The statistical classifier rates water quality as {} with {:.0}% confidence.",
        prediction.label,
        prediction.confidence * 100.0
    );
    if validation_missing {
        text.push_str(" Expert validation was unavailable for this request, so this assessment has not been reviewed.");
    }
    text
}

/// Remove duplicates ignoring case and surrounding whitespace; first occurrence wins
pub fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

#[derive(Debug, Error, PartialEq)]
pub enum FusionError {
    #[error("Neither the classifier nor validation produced a result")]
    NoSignals,

    #[error("Validation reply carried neither a score nor a status")]
    InsufficientValidation,
}

/// How far validation got for an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationState {
    Complete,
    Degraded,
    Unavailable,
}

/// Final water-quality assessment for one tank
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedAnalysis {
    pub tank_id: String,
    pub health_score: u8,
    pub status: HealthStatus,
    pub narrative: String,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub ml_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml_prediction: Option<ClassifierPrediction>,
    pub validation: ValidationState,
    pub timestamp: DateTime<Utc>,
}
