//! Core types shared across the analysis pipeline
//!
//! - Classifier output: [`QualityLabel`], [`ClassProbabilities`], [`ClassifierPrediction`]
//! - Fused severity scale: [`HealthStatus`]
//! - Disease candidates: [`DiseaseSeverity`], [`DiseaseCandidate`]

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Water-quality classifier output
// ============================================================================

/// Closed label set of the water-quality classifier, in model class order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Poor,
}

impl QualityLabel {
    /// Labels in model class-index order (0=Excellent, 1=Good, 2=Poor)
    pub const ALL: [QualityLabel; 3] = [QualityLabel::Excellent, QualityLabel::Good, QualityLabel::Poor];

    pub fn index(self) -> usize {
        match self {
            QualityLabel::Excellent => 0,
            QualityLabel::Good => 1,
            QualityLabel::Poor => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Poor => "Poor",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability of each label; sums to 1 within floating-point tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassProbabilities {
    pub excellent: f64,
    pub good: f64,
    pub poor: f64,
}

impl ClassProbabilities {
    pub fn from_array(p: [f64; 3]) -> Self {
        Self {
            excellent: p[0],
            good: p[1],
            poor: p[2],
        }
    }

    pub fn get(&self, label: QualityLabel) -> f64 {
        match label {
            QualityLabel::Excellent => self.excellent,
            QualityLabel::Good => self.good,
            QualityLabel::Poor => self.poor,
        }
    }

    pub fn sum(&self) -> f64 {
        self.excellent + self.good + self.poor
    }
}

/// Classifier result for one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierPrediction {
    pub label: QualityLabel,
    /// Probability of `label`, in [0, 1]
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
}

impl ClassifierPrediction {
    /// Build from a probability distribution; the label is the first maximum
    pub fn from_probabilities(p: [f64; 3]) -> Self {
        let mut best = 0;
        for i in 1..p.len() {
            if p[i] > p[best] {
                best = i;
            }
        }
        let label = QualityLabel::ALL[best];
        Self {
            label,
            confidence: p[best].clamp(0.0, 1.0),
            probabilities: ClassProbabilities::from_array(p),
        }
    }
}

// ============================================================================
// Fused status
// ============================================================================

/// Externally visible health status, ordered from mildest to most severe
///
/// The derived `Ord` is the severity order used by escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    NeedsAttention,
    Critical,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::NeedsAttention => "needs_attention",
            HealthStatus::Critical => "critical",
        }
    }

    /// Parse a status value from its leading word ("needs attention", "**Critical**", "fair")
    ///
    /// Only the leading word counts, so trailing remarks such as
    /// "good (no critical concerns)" cannot change the status.
    pub fn parse_loose(text: &str) -> Option<Self> {
        match leading_word(text)?.as_str() {
            "critical" | "severe" => Some(HealthStatus::Critical),
            "needs" | "poor" | "fair" | "moderate" => Some(HealthStatus::NeedsAttention),
            "excellent" => Some(HealthStatus::Excellent),
            "good" => Some(HealthStatus::Good),
            _ => None,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Disease detection
// ============================================================================

/// Disease severity / urgency scale, ordered from mildest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiseaseSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl DiseaseSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            DiseaseSeverity::None => "none",
            DiseaseSeverity::Low => "low",
            DiseaseSeverity::Medium => "medium",
            DiseaseSeverity::High => "high",
            DiseaseSeverity::Critical => "critical",
        }
    }

    /// Parse an urgency/severity value from its leading word
    pub fn parse_loose(text: &str) -> Option<Self> {
        match leading_word(text)?.as_str() {
            "critical" => Some(DiseaseSeverity::Critical),
            "high" | "severe" => Some(DiseaseSeverity::High),
            "medium" | "moderate" => Some(DiseaseSeverity::Medium),
            "low" => Some(DiseaseSeverity::Low),
            "none" => Some(DiseaseSeverity::None),
            _ => None,
        }
    }

    /// Severity band for a detection confidence
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            DiseaseSeverity::Critical
        } else if confidence >= 0.6 {
            DiseaseSeverity::High
        } else if confidence >= 0.4 {
            DiseaseSeverity::Medium
        } else {
            DiseaseSeverity::Low
        }
    }
}

impl fmt::Display for DiseaseSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a disease candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Classifier,
    Validation,
}

/// One candidate disease for an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseCandidate {
    pub name: String,
    pub confidence: f64,
    pub severity: DiseaseSeverity,
    pub source: CandidateSource,
}

// ============================================================================
// Free-text helpers
// ============================================================================

/// Lowercase alphanumeric words; punctuation, markdown and hyphens separate words
pub(crate) fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// First word of a field value, skipping intensifiers ("very high" reads as "high")
fn leading_word(text: &str) -> Option<String> {
    words(text)
        .into_iter()
        .find(|w| !matches!(w.as_str(), "very" | "extremely"))
}
