//! Prompt construction for the generative validator
//!
//! Prompts separate what was measured from what the classifier had to fill
//! in. Defaulted values are named but never shown as readings, so the
//! validator cannot mistake them for observations.

use crate::features::FeatureVector;
use crate::session::ConversationTurn;
use crate::types::{ClassifierPrediction, DiseaseCandidate};
use aquasense_common::{MeasuredReading, WaterParameter};
use std::fmt::Write;

/// Upper bound on conversation turns included in a prompt
pub const MAX_CONTEXT_TURNS: usize = 10;

/// Everything the water-quality prompt draws on
pub struct WaterQualityPrompt<'a> {
    pub reading: &'a MeasuredReading,
    pub vector: &'a FeatureVector,
    pub prediction: Option<&'a ClassifierPrediction>,
    pub species: &'a [String],
    pub context: &'a [ConversationTurn],
}

impl WaterQualityPrompt<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "You are an aquaculture water quality specialist validating an automated assessment for a tank stocked with {}.",
            species_phrase(self.species)
        );
        out.push('\n');

        out.push_str("MEASURED PARAMETERS (reported by the tank's sensors):\n");
        if self.reading.is_empty() {
            out.push_str("- none reported\n");
        }
        for parameter in self.reading.parameters() {
            if let Some(value) = self.reading.get(parameter) {
                let _ = writeln!(out, "- {}", format_value(parameter, value));
            }
        }
        out.push('\n');

        let defaulted = self.vector.defaulted_parameters();
        if !defaulted.is_empty() {
            out.push_str("NOT MEASURED:\n");
            let _ = writeln!(
                out,
                "The statistical classifier substituted typical values for: {}.",
                names(&defaulted)
            );
            out.push_str(
                "These substitutes are NOT measurements. Do not describe them as observed conditions.\n\n",
            );
        }

        out.push_str("STATISTICAL CLASSIFIER SIGNAL:\n");
        match self.prediction {
            Some(p) => {
                let _ = writeln!(
                    out,
                    "Predicted water quality: {} (confidence {:.0}%; Excellent {:.0}%, Good {:.0}%, Poor {:.0}%).",
                    p.label,
                    p.confidence * 100.0,
                    p.probabilities.excellent * 100.0,
                    p.probabilities.good * 100.0,
                    p.probabilities.poor * 100.0
                );
                let _ = writeln!(
                    out,
                    "It was computed from {} measured and {} substituted inputs.",
                    self.vector.measured_count(),
                    defaulted.len()
                );
                out.push_str(
                    "Treat this label as a preliminary signal to validate, not a ground truth to defer to blindly. \
                     If the measured values contradict it, say so and rate the tank on the measurements.\n",
                );
            }
            None => out.push_str(
                "No classifier prediction is available. Base the assessment on the measured parameters only.\n",
            ),
        }
        out.push('\n');

        push_context(&mut out, self.context);

        out.push_str(
            "Reply using exactly these sections, each starting on its own line:\n\
             STATUS: one of excellent, good, needs_attention, critical\n\
             HEALTH_SCORE: integer from 0 to 100\n\
             SUMMARY: two to four sentences on the tank's condition for the stocked species\n\
             WARNINGS: one bullet per problem; start a bullet with \"CRITICAL:\" when it needs immediate action; write \"none\" if there are none\n\
             RECOMMENDATIONS: one bullet per concrete action\n",
        );
        out
    }
}

/// Everything the disease prompt draws on
pub struct DiseasePrompt<'a> {
    pub candidates: Option<&'a [DiseaseCandidate]>,
    pub symptom_text: Option<&'a str>,
    pub reading: Option<&'a MeasuredReading>,
    pub context: &'a [ConversationTurn],
}

impl DiseasePrompt<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(
            "You are an aquaculture fish health specialist reviewing a possible disease case from a fish photo.\n\n",
        );

        out.push_str("IMAGE CLASSIFIER SIGNAL:\n");
        match self.candidates {
            Some([]) => out.push_str(
                "The image classifier found no candidate above its reporting threshold.\n",
            ),
            Some(candidates) => {
                for c in candidates {
                    let _ = writeln!(out, "- {} ({:.0}% confidence)", c.name, c.confidence * 100.0);
                }
                out.push_str(
                    "Treat these candidates as preliminary signals to validate, not ground truth to defer to blindly.\n",
                );
            }
            None => out.push_str("No image classifier result is available.\n"),
        }
        out.push('\n');

        if let Some(symptoms) = self.symptom_text.map(str::trim).filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "OBSERVED SYMPTOMS (from the farmer):\n{}\n", symptoms);
        }

        if let Some(reading) = self.reading.filter(|r| !r.is_empty()) {
            out.push_str("LATEST MEASURED WATER PARAMETERS FOR THIS TANK:\n");
            for parameter in reading.parameters() {
                if let Some(value) = reading.get(parameter) {
                    let _ = writeln!(out, "- {}", format_value(parameter, value));
                }
            }
            out.push('\n');
        }

        push_context(&mut out, self.context);

        out.push_str(
            "Reply using exactly these sections, each starting on its own line:\n\
             SUMMARY: two to four sentences\n\
             DISEASES: one bullet per likely disease as \"- name | confidence 0-1 | severity low/medium/high/critical\"\n\
             CAUSES: bullets\n\
             SYMPTOMS: bullets\n\
             TREATMENT: bullets, most urgent step first\n\
             PREVENTION: bullets\n\
             URGENCY: one of low, medium, high, critical\n",
        );
        out
    }
}

fn push_context(out: &mut String, context: &[ConversationTurn]) {
    if context.is_empty() {
        return;
    }
    out.push_str("RECENT CONVERSATION:\n");
    let skip = context.len().saturating_sub(MAX_CONTEXT_TURNS);
    for turn in &context[skip..] {
        let _ = writeln!(out, "{}: {}", turn.role, turn.content.trim());
    }
    out.push('\n');
}

fn species_phrase(species: &[String]) -> String {
    let named: Vec<&str> = species.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if named.is_empty() {
        "unspecified fish species".to_string()
    } else {
        named.join(", ")
    }
}

fn format_value(parameter: WaterParameter, value: f64) -> String {
    let unit = parameter.unit();
    if unit.is_empty() {
        format!("{}: {}", parameter, value)
    } else {
        format!("{}: {} {}", parameter, value, unit)
    }
}

fn names(parameters: &[WaterParameter]) -> String {
    parameters
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}
