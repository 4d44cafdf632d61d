//! Disease fusion: classifier candidates + validation review

use super::catalog::{profile, HEALTHY_LABEL};
use crate::fusion::{dedup_case_insensitive, FusionError, FusionPolicy, ValidationState};
use crate::types::{DiseaseCandidate, DiseaseSeverity};
use crate::validation::DiseaseValidation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseDetectionResult {
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tank_id: Option<String>,
    /// Most likely first
    pub candidates: Vec<DiseaseCandidate>,
    pub severity: DiseaseSeverity,
    pub urgent_action_required: bool,
    pub recommendation: String,
    pub causes: Vec<String>,
    pub symptoms: Vec<String>,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
    pub ml_enabled: bool,
    pub validation: ValidationState,
    pub timestamp: DateTime<Utc>,
}

/// Merge classifier candidates with the validation review
///
/// `classifier` is `None` when the image model did not run; `Some(vec![])`
/// means it ran and nothing cleared the reporting thresholds. Urgency is
/// raised by either source: a confident detection of a serious disease, or
/// a validation reply that flags high urgency.
pub fn fuse_disease(
    image_id: String,
    tank_id: Option<String>,
    classifier: Option<Vec<DiseaseCandidate>>,
    validation: Option<DiseaseValidation>,
    policy: &FusionPolicy,
) -> Result<DiseaseDetectionResult, FusionError> {
    if classifier.is_none() && validation.is_none() {
        return Err(FusionError::NoSignals);
    }

    let ml_enabled = classifier.is_some();
    let mut candidates = classifier.unwrap_or_default();

    let classifier_urgent = candidates.first().map_or(false, |top| {
        top.confidence >= policy.urgent_confidence && profile(&top.name).map_or(false, |p| p.serious)
    });

    if let Some(v) = &validation {
        for extra in &v.diseases {
            let duplicate = candidates.iter().any(|c| same_disease(&c.name, &extra.name));
            if !duplicate {
                candidates.push(extra.clone());
            }
        }
    }
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let candidate_severity = candidates
        .iter()
        .filter(|c| !is_healthy(&c.name))
        .map(|c| c.severity.min(DiseaseSeverity::from_confidence(c.confidence)))
        .max()
        .unwrap_or(DiseaseSeverity::None);
    let validation_urgency = validation.as_ref().and_then(|v| v.urgency);
    let validation_urgent = validation.as_ref().map_or(false, |v| v.is_urgent());

    let urgent = classifier_urgent || validation_urgent;
    let mut severity = candidate_severity.max(validation_urgency.unwrap_or(DiseaseSeverity::None));
    if urgent {
        severity = severity.max(DiseaseSeverity::High);
    }

    let top_profile = candidates.first().and_then(|c| profile(&c.name));
    let (recommendation, causes, symptoms, treatment, prevention, state) = match validation {
        Some(v) => {
            let state = if v.degraded {
                ValidationState::Degraded
            } else {
                ValidationState::Complete
            };
            let recommendation = if v.narrative.trim().is_empty() {
                classifier_recommendation(&candidates)
            } else {
                v.narrative.trim().to_string()
            };
            let or_catalog = |from_reply: Vec<String>, pick: fn(&super::DiseaseProfile) -> Vec<String>| {
                if from_reply.is_empty() {
                    top_profile.map(pick).unwrap_or_default()
                } else {
                    dedup_case_insensitive(from_reply)
                }
            };
            (
                recommendation,
                or_catalog(v.causes, catalog_causes),
                or_catalog(v.symptoms, catalog_symptoms),
                or_catalog(v.treatment, catalog_treatment),
                or_catalog(v.prevention, catalog_prevention),
                state,
            )
        }
        None => (
            classifier_recommendation(&candidates),
            top_profile.map(catalog_causes).unwrap_or_default(),
            top_profile.map(catalog_symptoms).unwrap_or_default(),
            top_profile.map(catalog_treatment).unwrap_or_default(),
            top_profile.map(catalog_prevention).unwrap_or_default(),
            ValidationState::Unavailable,
        ),
    };

    Ok(DiseaseDetectionResult {
        image_id,
        tank_id,
        candidates,
        severity,
        urgent_action_required: urgent,
        recommendation,
        causes,
        symptoms,
        treatment,
        prevention,
        ml_enabled,
        validation: state,
        timestamp: Utc::now(),
    })
}

fn is_healthy(name: &str) -> bool {
    profile(name).map_or(false, |p| p.label == HEALTHY_LABEL)
}

fn same_disease(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    match (profile(a), profile(b)) {
        (Some(pa), Some(pb)) => pa.label == pb.label,
        _ => false,
    }
}

fn classifier_recommendation(candidates: &[DiseaseCandidate]) -> String {
    match candidates.first() {
        None => "No disease was identified with enough confidence. Monitor the fish and submit a clearer photo \
                 or a symptom description if signs persist."
            .to_string(),
        Some(top) if is_healthy(&top.name) => {
            "The fish appears healthy. Continue regular monitoring and water quality maintenance.".to_string()
        }
        Some(top) => {
            let mut text = format!(
                "The image classifier suggests {} ({:.0}% confidence).",
                top.name,
                top.confidence * 100.0
            );
            if let Some(p) = profile(&top.name) {
                text.push(' ');
                text.push_str(p.treatment);
            }
            text
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn catalog_causes(p: &super::DiseaseProfile) -> Vec<String> {
    to_strings(p.causes)
}

fn catalog_symptoms(p: &super::DiseaseProfile) -> Vec<String> {
    to_strings(p.symptoms)
}

fn catalog_treatment(p: &super::DiseaseProfile) -> Vec<String> {
    vec![p.treatment.to_string()]
}

fn catalog_prevention(p: &super::DiseaseProfile) -> Vec<String> {
    to_strings(p.prevention)
}
