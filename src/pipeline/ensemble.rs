//! Ensemble merge of analyzer signals
//!
//! Combines the six independent signals into one [`AnalyzerResult`]:
//! per-analyzer scores, a calibrated confidence, the reasoning trace and the
//! explainability block. The merge is a pure, deterministic function.
//!
//! # Confidence calibration
//!
//! ```text
//! base  = 0.48
//!       + (0.12 if explicit constraints else -0.04)
//!       + (0.10 if structured format else 0.03)
//!       + min(depth * 0.35, 0.23)
//!       - (0.35 if injection suspected)
//! conf  = clamp(1 / (1 + e^(-4 (base - 0.5))), 0.03, 0.99)   rounded to 0.01
//! ```

use crate::analyzers::{
    ConstraintSignal, FormatSignal, InjectionSignal, ReasoningSignal, StructureSignal, Tone,
    ToneSignal,
};
use crate::output::schema::{
    AnalyzerResult, AnalyzerScores, Explainability, TaskType, MAX_CONFIDENCE, MIN_CONFIDENCE,
    NO_RISK_FLAGS,
};

const BASE_CONFIDENCE: f64 = 0.48;
const EXPLICIT_CONSTRAINT_BONUS: f64 = 0.12;
const IMPLICIT_CONSTRAINT_PENALTY: f64 = 0.04;
const STRUCTURED_FORMAT_BONUS: f64 = 0.1;
const PLAIN_FORMAT_BONUS: f64 = 0.03;
const DEPTH_WEIGHT: f64 = 0.35;
const MAX_DEPTH_BONUS: f64 = 0.23;
const INJECTION_PENALTY: f64 = 0.35;
const LOGISTIC_STEEPNESS: f64 = 4.0;
const LOGISTIC_MIDPOINT: f64 = 0.5;

/// The six signals produced for one input text
#[derive(Debug, Clone)]
pub struct Signals {
    pub structure: StructureSignal,
    pub constraints: ConstraintSignal,
    pub tone: ToneSignal,
    pub format: FormatSignal,
    pub reasoning: ReasoningSignal,
    pub injection: InjectionSignal,
}

impl Signals {
    /// Analyzer traces in fixed pipeline order
    pub fn traces(&self) -> [&str; 6] {
        [
            &self.structure.trace,
            &self.constraints.trace,
            &self.tone.trace,
            &self.format.trace,
            &self.reasoning.trace,
            &self.injection.trace,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEnsemble;

impl ScoringEnsemble {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, signals: &Signals) -> AnalyzerResult {
        let confidence = calibrated_confidence(signals);

        let mut reasoning_trace: Vec<String> =
            signals.traces().iter().map(|t| t.to_string()).collect();
        reasoning_trace.push(format!("confidence={:.2}", confidence));

        let risk_flags = if signals.injection.matched_patterns.is_empty() {
            vec![NO_RISK_FLAGS.to_string()]
        } else {
            signals.injection.matched_patterns.clone()
        };

        let explainability = Explainability {
            summary: format!(
                "Detected {} style and {} task with {} constraint signals.",
                signals.structure.prompt_style,
                signals.structure.task_type,
                signals.constraints.constraints.len()
            ),
            key_signals: vec![
                signals.structure.trace.clone(),
                signals.constraints.trace.clone(),
                signals.format.trace.clone(),
            ],
            risk_flags,
        };

        AnalyzerResult {
            inferred_prompt: signals.structure.inferred_prompt.clone(),
            prompt_style: signals.structure.prompt_style,
            task_type: signals.structure.task_type,
            constraints_detected: signals.constraints.constraints.clone(),
            temperature_estimate: signals.tone.temperature,
            reasoning_trace,
            analyzer_scores: analyzer_scores(signals),
            explainability,
            confidence_score: confidence,
        }
    }
}

pub fn analyzer_scores(signals: &Signals) -> AnalyzerScores {
    AnalyzerScores {
        structure: if signals.structure.task_type != TaskType::General {
            0.8
        } else {
            0.55
        },
        constraint: (0.3 + 0.15 * signals.constraints.constraints.len() as f64).min(0.95),
        tone: if signals.tone.tone != Tone::Neutral {
            0.75
        } else {
            0.6
        },
        format: if signals.format.is_structured() {
            0.8
        } else {
            0.55
        },
        reasoning_depth: round2(signals.reasoning.depth_score),
        injection_safety: if signals.injection.suspected_injection {
            0.25
        } else {
            0.9
        },
    }
}

pub fn calibrated_confidence(signals: &Signals) -> f64 {
    let mut base = BASE_CONFIDENCE;
    if signals.constraints.has_explicit() {
        base += EXPLICIT_CONSTRAINT_BONUS;
    } else {
        base -= IMPLICIT_CONSTRAINT_PENALTY;
    }
    base += if signals.format.is_structured() {
        STRUCTURED_FORMAT_BONUS
    } else {
        PLAIN_FORMAT_BONUS
    };
    base += (signals.reasoning.depth_score * DEPTH_WEIGHT).min(MAX_DEPTH_BONUS);
    if signals.injection.suspected_injection {
        base -= INJECTION_PENALTY;
    }

    let squashed = 1.0 / (1.0 + (-LOGISTIC_STEEPNESS * (base - LOGISTIC_MIDPOINT)).exp());
    round2(squashed.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
