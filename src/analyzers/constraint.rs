//! Explicit constraint detection
//!
//! Looks for formatting, length and style requirements that leak into the
//! generated text. Every pattern is checked independently and all hits are
//! kept in table order.

use super::Analyzer;
use crate::output::schema::NO_EXPLICIT_CONSTRAINTS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static CONSTRAINT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("json_format", r#"(?i)json|\{\s*".*"\s*:\s*"#),
        ("bullet_points", r"(?m)^-\s|^\*\s"),
        ("length_limit", r"(?i)\b\d+\s*(words|sentences|characters)\b"),
        ("stepwise", r"(?i)step\s*\d+|first[,\s]|second[,\s]"),
        ("no_fluff", r"(?i)concise|brief|without fluff|only"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("valid regex")))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintSignal {
    pub constraints: Vec<String>,
    pub trace: String,
}

impl ConstraintSignal {
    /// True unless only the sentinel label is present
    pub fn has_explicit(&self) -> bool {
        self.constraints
            .first()
            .is_some_and(|label| label != NO_EXPLICIT_CONSTRAINTS)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintDetector;

impl ConstraintDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for ConstraintDetector {
    type Signal = ConstraintSignal;

    fn name(&self) -> &'static str {
        "constraint"
    }

    fn analyze(&self, text: &str) -> ConstraintSignal {
        let mut constraints: Vec<String> = CONSTRAINT_PATTERNS
            .iter()
            .filter(|(_, pattern)| pattern.is_match(text))
            .map(|(label, _)| label.to_string())
            .collect();

        if constraints.is_empty() {
            constraints.push(NO_EXPLICIT_CONSTRAINTS.to_string());
        }

        let trace = format!("constraint_hits={}", constraints.join(","));
        ConstraintSignal { constraints, trace }
    }
}
