//! Reply parsing
//!
//! Replies are requested in a keyed-section layout (`STATUS:`, `WARNINGS:`,
//! ...). Models decorate that layout freely, so headers are matched loosely:
//! markdown emphasis, `#` headings, spaces vs. underscores and letter case
//! are all tolerated. Each field is parsed on its own; one bad field does not
//! spoil the rest.

use super::{DiseaseValidation, ValidationOutcome, ValidationResult};
use crate::disease::profile;
use crate::types::{words, CandidateSource, DiseaseCandidate, DiseaseSeverity, HealthStatus};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Status,
    HealthScore,
    Summary,
    Warnings,
    Recommendations,
    Diseases,
    Causes,
    Symptoms,
    Treatment,
    Prevention,
    Urgency,
}

const WATER_SECTIONS: &[(&str, Section)] = &[
    ("status", Section::Status),
    ("health score", Section::HealthScore),
    ("score", Section::HealthScore),
    ("summary", Section::Summary),
    ("assessment", Section::Summary),
    ("warnings", Section::Warnings),
    ("recommendations", Section::Recommendations),
];

const DISEASE_SECTIONS: &[(&str, Section)] = &[
    ("summary", Section::Summary),
    ("assessment", Section::Summary),
    ("diseases", Section::Diseases),
    ("possible diseases", Section::Diseases),
    ("causes", Section::Causes),
    ("symptoms", Section::Symptoms),
    ("treatment", Section::Treatment),
    ("prevention", Section::Prevention),
    ("urgency", Section::Urgency),
];

/// Words that mark a warning as describing an acute, critical condition
const CRITICAL_MARKERS: &[&str] = &["critical", "lethal", "fatal", "emergency", "acutely toxic"];

/// Tokens that negate a marker appearing within [`NEGATION_REACH`] words after them
///
/// `t` is what remains of "isn't" / "don't" after splitting on punctuation.
const NEGATIONS: &[&str] = &["no", "not", "non", "nothing", "without", "never", "nor", "t"];
const NEGATION_REACH: usize = 3;

type Sections = HashMap<Section, Vec<String>>;

/// Parse a water-quality validation reply
pub fn parse_water_quality_reply(reply: &str) -> ValidationOutcome<ValidationResult> {
    let text = reply.trim();
    let sections = split_sections(text, WATER_SECTIONS);

    let status = field(&sections, Section::Status).and_then(|l| HealthStatus::parse_loose(&join(l)));
    let health_score = field(&sections, Section::HealthScore).and_then(|l| parse_score(&join(l)));
    let narrative = field(&sections, Section::Summary).map(|l| join(l)).unwrap_or_default();

    if status.is_none() && health_score.is_none() && narrative.is_empty() {
        tracing::debug!("Validation reply has no recognizable fields; keeping raw narrative");
        return ValidationOutcome::Degraded(ValidationResult {
            narrative: text.to_string(),
            implied_status: keyword_status(text),
            degraded: true,
            ..Default::default()
        });
    }

    let warnings = field(&sections, Section::Warnings).map(|l| list_items(l)).unwrap_or_default();
    let recommendations = field(&sections, Section::Recommendations)
        .map(|l| list_items(l))
        .unwrap_or_default();

    let critical_warning = warnings.iter().any(|w| is_critical_warning(w)).then_some(HealthStatus::Critical);

    ValidationOutcome::Complete(ValidationResult {
        narrative,
        warnings,
        recommendations,
        health_score,
        implied_status: status.max(critical_warning),
        degraded: false,
    })
}

/// Parse a disease validation reply
pub fn parse_disease_reply(reply: &str) -> ValidationOutcome<DiseaseValidation> {
    let text = reply.trim();
    let sections = split_sections(text, DISEASE_SECTIONS);

    let narrative = field(&sections, Section::Summary).map(|l| join(l)).unwrap_or_default();
    let diseases: Vec<DiseaseCandidate> = field(&sections, Section::Diseases)
        .map(|l| list_items(l).iter().filter_map(|item| parse_disease_line(item)).collect())
        .unwrap_or_default();
    let urgency = field(&sections, Section::Urgency).and_then(|l| DiseaseSeverity::parse_loose(&join(l)));

    if narrative.is_empty() && diseases.is_empty() && urgency.is_none() {
        tracing::debug!("Disease reply has no recognizable fields; keeping raw narrative");
        return ValidationOutcome::Degraded(DiseaseValidation {
            narrative: text.to_string(),
            urgency: keyword_urgency(text),
            degraded: true,
            ..Default::default()
        });
    }

    let list = |s: Section| field(&sections, s).map(|l| list_items(l)).unwrap_or_default();

    ValidationOutcome::Complete(DiseaseValidation {
        narrative,
        diseases,
        causes: list(Section::Causes),
        symptoms: list(Section::Symptoms),
        treatment: list(Section::Treatment),
        prevention: list(Section::Prevention),
        urgency,
        degraded: false,
    })
}

fn field(sections: &Sections, section: Section) -> Option<&[String]> {
    sections.get(&section).map(Vec::as_slice).filter(|l| !l.is_empty())
}

/// Split text into known sections; lines before the first header are dropped
fn split_sections(text: &str, known: &[(&str, Section)]) -> Sections {
    let mut sections: Sections = HashMap::new();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some((section, inline)) = match_header(line, known) {
            current = Some(section);
            let entry = sections.entry(section).or_default();
            if !inline.is_empty() {
                entry.push(inline);
            }
            continue;
        }
        if let Some(section) = current {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                sections.entry(section).or_default().push(trimmed.to_string());
            }
        }
    }

    sections
}

/// Recognize `KEY: rest`, `**KEY:** rest`, `## KEY` and similar
fn match_header(line: &str, known: &[(&str, Section)]) -> Option<(Section, String)> {
    let stripped = line.trim().trim_start_matches(['#', '*', '_', ' ']);
    let (key, rest) = match stripped.split_once(':') {
        Some((key, rest)) => (key, rest),
        None => (stripped, ""),
    };

    let key = key
        .trim()
        .trim_matches(['*', '_'])
        .trim()
        .to_lowercase()
        .replace('_', " ");

    known
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, section)| (*section, rest.trim().trim_matches(['*', '_']).trim().to_string()))
}

fn join(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| l.trim().trim_matches('*').trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lines of a list section with bullets and numbering removed
fn list_items(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| strip_bullet(l))
        .filter(|l| !l.is_empty() && !is_none_marker(l))
        .collect()
}

fn strip_bullet(line: &str) -> String {
    let mut s = line.trim();
    for marker in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = s.strip_prefix(marker) {
            s = rest;
            break;
        }
    }
    // "1." / "2)" numbering
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            s = rest;
        }
    }
    s.trim().trim_matches('*').trim().to_string()
}

fn is_none_marker(item: &str) -> bool {
    let lower = item.trim_end_matches('.').trim().to_lowercase();
    matches!(lower.as_str(), "none" | "n/a" | "na" | "no warnings" | "none identified" | "nothing")
}

/// First number in the text, rounded; `None` outside 0-100
fn parse_score(text: &str) -> Option<u8> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = number.trim_end_matches('.').parse().ok()?;
    let rounded = value.round();
    (0.0..=100.0).contains(&rounded).then_some(rounded as u8)
}

/// A warning is critical when it carries the `CRITICAL:` prefix the prompt
/// asks for, or an un-negated critical marker anywhere in its text
fn is_critical_warning(warning: &str) -> bool {
    let head = warning.trim_start_matches(['*', '_', ' ']);
    let prefixed = head
        .split_once(':')
        .map(|(key, _)| key.trim().trim_matches(['*', '_']).eq_ignore_ascii_case("critical"))
        .unwrap_or(false);
    prefixed || mentions_unnegated(warning, CRITICAL_MARKERS)
}

/// True when any phrase occurs as whole words without a negation just before it
fn mentions_unnegated(text: &str, phrases: &[&str]) -> bool {
    let tokens = words(text);
    phrases.iter().any(|phrase| {
        let needle: Vec<&str> = phrase.split_whitespace().collect();
        if needle.is_empty() || needle.len() > tokens.len() {
            return false;
        }
        (0..=tokens.len() - needle.len()).any(|start| {
            let matched = tokens[start..start + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(token, word)| token == word);
            matched
                && !tokens[start.saturating_sub(NEGATION_REACH)..start]
                    .iter()
                    .any(|t| NEGATIONS.contains(&t.as_str()))
        })
    })
}

/// Coarse severity from free text when the layout was not followed
fn keyword_status(text: &str) -> Option<HealthStatus> {
    if mentions_unnegated(text, &["critical", "severe"]) {
        Some(HealthStatus::Critical)
    } else if mentions_unnegated(text, &["poor", "bad", "fair", "moderate"]) {
        Some(HealthStatus::NeedsAttention)
    } else {
        None
    }
}

fn keyword_urgency(text: &str) -> Option<DiseaseSeverity> {
    if mentions_unnegated(text, &["critical"]) {
        Some(DiseaseSeverity::Critical)
    } else if mentions_unnegated(text, &["urgent", "urgently", "emergency", "immediate", "immediately"]) {
        Some(DiseaseSeverity::High)
    } else {
        None
    }
}

/// Parse `Name | confidence | severity`, `Name (75%)` or `Name - high confidence`
///
/// Lines without any usable confidence are skipped.
fn parse_disease_line(item: &str) -> Option<DiseaseCandidate> {
    let parts: Vec<&str> = item.split('|').map(str::trim).collect();

    let (name, confidence, severity_text) = if parts.len() >= 2 {
        (parts[0].to_string(), parse_confidence(parts[1])?, parts.get(2).copied())
    } else if let Some((name, rest)) = item.split_once('(') {
        (name.trim().to_string(), parse_confidence(rest.trim_end_matches(')'))?, None)
    } else {
        let (name, rest) = item.split_once(" - ").or_else(|| item.split_once(':'))?;
        (name.trim().to_string(), parse_confidence(rest)?, None)
    };

    if name.is_empty() {
        return None;
    }

    let severity = severity_text
        .and_then(DiseaseSeverity::parse_loose)
        .or_else(|| profile(&name).map(|p| p.severity))
        .unwrap_or(DiseaseSeverity::Medium);

    Some(DiseaseCandidate {
        name,
        confidence,
        severity,
        source: CandidateSource::Validation,
    })
}

/// "0.75", "75%", "75" or a level word ("high" = 0.8, "medium" = 0.5, "low" = 0.3)
fn parse_confidence(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(start) = text.find(|c: char| c.is_ascii_digit()) {
        let number: String = text[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if let Ok(value) = number.trim_end_matches('.').parse::<f64>() {
            let value = if value > 1.0 { value / 100.0 } else { value };
            return Some(value.clamp(0.0, 1.0));
        }
    }
    match words(text).first().map(String::as_str) {
        Some("high") => Some(0.8),
        Some("medium") | Some("moderate") => Some(0.5),
        Some("low") => Some(0.3),
        _ => None,
    }
}
