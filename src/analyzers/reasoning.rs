//! Reasoning depth estimation from linguistic proxies

use super::{count_occurrences, split_lines, Analyzer};
use serde::Serialize;

const CONNECTORS: &[&str] = &["because", "therefore", "however", "if", "then", "thus", "so that"];

const CONNECTOR_WEIGHT: f64 = 0.08;
const STEP_WEIGHT: f64 = 0.1;
const WORDS_PER_LENGTH_UNIT: f64 = 1500.0;
const MAX_LENGTH_CONTRIBUTION: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningSignal {
    /// Normalized depth in `[0, 1]`
    pub depth_score: f64,
    pub trace: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReasoningDepthEstimator;

impl ReasoningDepthEstimator {
    pub fn new() -> Self {
        Self
    }
}

fn is_step_line(line: &str) -> bool {
    line.trim()
        .chars()
        .next()
        .is_some_and(|c| ('1'..='9').contains(&c))
}

impl Analyzer for ReasoningDepthEstimator {
    type Signal = ReasoningSignal;

    fn name(&self) -> &'static str {
        "reasoning"
    }

    fn analyze(&self, text: &str) -> ReasoningSignal {
        // floored at 1 so the length term never divides by zero
        let words = text.split_whitespace().count().max(1);
        let connectors = count_occurrences(&text.to_lowercase(), CONNECTORS);
        let steps = split_lines(text)
            .into_iter()
            .filter(|line| is_step_line(line))
            .count();

        let raw = connectors as f64 * CONNECTOR_WEIGHT
            + steps as f64 * STEP_WEIGHT
            + (words as f64 / WORDS_PER_LENGTH_UNIT).min(MAX_LENGTH_CONTRIBUTION);

        ReasoningSignal {
            depth_score: raw.clamp(0.0, 1.0),
            trace: format!("connectors={}, steps={}", connectors, steps),
        }
    }
}
