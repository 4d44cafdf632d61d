//! Fish disease detection from images
//!
//! The image classifier proposes candidates; the generative validator
//! reviews them together with any symptom description; [`fusion`] merges
//! both into a [`DiseaseDetectionResult`].

pub mod catalog;
pub mod fusion;
pub mod model;

pub use catalog::{profile, DiseaseProfile, DISEASE_CATALOG, HEALTHY_LABEL};
pub use fusion::{fuse_disease, DiseaseDetectionResult};
pub use model::{DiseaseArtifact, DiseaseModel};

use crate::fusion::FusionPolicy;
use crate::types::{CandidateSource, DiseaseCandidate, DiseaseSeverity};
use sha2::{Digest, Sha256};

/// Stable identifier for an image: first 16 hex digits of its SHA-256
pub fn image_id(image_bytes: &[u8]) -> String {
    Sha256::digest(image_bytes)
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Filter raw classifier scores into reportable candidates
///
/// Drops scores under the minimum confidence, keeps "Healthy Fish" only when
/// it clears the stricter healthy threshold, and caps the list length.
/// Input must be sorted by descending probability.
pub fn select_candidates(scored: &[(String, f64)], policy: &FusionPolicy) -> Vec<DiseaseCandidate> {
    scored
        .iter()
        .filter(|(_, p)| *p >= policy.disease_min_confidence)
        .filter(|(label, p)| label != HEALTHY_LABEL || *p >= policy.healthy_min_confidence)
        .take(policy.max_disease_candidates)
        .map(|(label, p)| {
            let known = profile(label);
            DiseaseCandidate {
                name: known.map(|k| k.name.to_string()).unwrap_or_else(|| label.clone()),
                confidence: *p,
                severity: known.map(|k| k.severity).unwrap_or(DiseaseSeverity::Medium),
                source: CandidateSource::Classifier,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(l, p)| (l.to_string(), *p)).collect()
    }

    #[test]
    fn test_image_id_is_sixteen_hex_digits() {
        let id = image_id(b"fish");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, image_id(b"fish"));
        assert_ne!(id, image_id(b"other fish"));
    }

    #[test]
    fn test_low_confidence_candidates_dropped() {
        let policy = FusionPolicy::default();
        let candidates = select_candidates(
            &scored(&[("Parasitic diseases", 0.55), ("Bacterial gill disease", 0.15)]),
            &policy,
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Parasitic Infections");
    }

    #[test]
    fn test_healthy_requires_high_confidence() {
        let policy = FusionPolicy::default();
        let weak = select_candidates(&scored(&[(HEALTHY_LABEL, 0.65), ("Parasitic diseases", 0.3)]), &policy);
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].name, "Parasitic Infections");

        let strong = select_candidates(&scored(&[(HEALTHY_LABEL, 0.9)]), &policy);
        assert_eq!(strong[0].severity, DiseaseSeverity::None);
    }

    #[test]
    fn test_candidates_capped_at_three() {
        let policy = FusionPolicy::default();
        let candidates = select_candidates(
            &scored(&[
                ("Bacterial Red disease", 0.25),
                ("Parasitic diseases", 0.25),
                ("Bacterial gill disease", 0.25),
                ("Fungal diseases Saprolegniasis", 0.25),
            ]),
            &policy,
        );
        assert_eq!(candidates.len(), 3);
    }
}
