//! Confidence Scorer
//!
//! Deterministic heuristic mapping an answer and run metadata to a score in
//! [`MIN_CONFIDENCE`, `MAX_CONFIDENCE`]. It measures length, depth and
//! surface lexical cues, not truthfulness.

use regex::Regex;
use std::sync::OnceLock;

pub const MIN_CONFIDENCE: u8 = 22;
pub const MAX_CONFIDENCE: u8 = 97;

const BASE: f64 = 45.0;

const EVIDENCE_PHRASES: [&str; 4] = [
    "according to",
    "research shows",
    "evidence suggests",
    "data shows",
];

static STRUCTURE_MARKERS: OnceLock<Vec<Regex>> = OnceLock::new();

fn structure_markers() -> &'static [Regex] {
    STRUCTURE_MARKERS.get_or_init(|| {
        [
            // Markdown heading at line start, with or without a space
            r"(?m)^\s*#{1,6}",
            // Table pipe
            r"\|",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn has_structure(answer: &str) -> bool {
    structure_markers().iter().any(|re| re.is_match(answer))
}

fn evidence_matches(answer: &str) -> usize {
    let lower = answer.to_lowercase();
    EVIDENCE_PHRASES
        .iter()
        .map(|phrase| lower.matches(phrase).count())
        .sum()
}

/// Score an answer.
///
/// `aux_doc_count` counts supporting documents fed into the run; the engine
/// currently always passes 0.
pub fn score(answer: &str, completed_passes: usize, aux_doc_count: usize, has_memory: bool) -> u8 {
    let words = answer.split_whitespace().count() as f64;

    let mut total = BASE;
    total += (words / 120.0).min(15.0);
    total += (completed_passes as f64 * 3.5).min(18.0);
    total += (aux_doc_count as f64 * 2.0).min(12.0);
    if has_memory {
        total += 5.0;
    }
    total += (evidence_matches(answer) as f64 * 1.5).min(10.0);
    if has_structure(answer) {
        total += 4.0;
    }

    total
        .round()
        .clamp(MIN_CONFIDENCE as f64, MAX_CONFIDENCE as f64) as u8
}
