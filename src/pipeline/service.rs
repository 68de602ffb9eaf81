//! Reverse-engineering service orchestration
//!
//! The service owns one instance of each analyzer and the scoring ensemble.
//! For every call it:
//! 1. Resolves the determinism seed for this run
//! 2. Runs all six analyzers over the text
//! 3. Merges their signals into an [`AnalyzerResult`]
//!
//! # Example
//!
//! ```
//! use prompt_reverse::pipeline::ReverseEngineeringService;
//!
//! let service = ReverseEngineeringService::default();
//! let result = service.analyze("Step 1: Think. Step 2: Return JSON {\"a\":1}", true, Some(7));
//!
//! assert!(result.constraints_detected.contains(&"stepwise".to_string()));
//! assert!((0.03..=0.99).contains(&result.confidence_score));
//! ```

use super::ensemble::{ScoringEnsemble, Signals};
use crate::analyzers::{
    Analyzer, ConstraintDetector, FormatDetector, PromptInjectionDetector,
    ReasoningDepthEstimator, StructureAnalyzer, ToneClassifier, DEFAULT_INJECTION_THRESHOLD,
};
use crate::config::DEFAULT_SEED;
use crate::output::schema::{AnalyzerResult, ReverseResponse};
use std::time::Instant;
use tracing::debug;

/// Per-call execution parameters
///
/// The seed is scoped to one run rather than installed in any process-wide
/// generator, so concurrent requests never observe each other's seeds. No
/// analyzer consumes randomness today; the seed is resolved and traced so
/// stochastic analyzers can draw from it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisRun {
    pub seed: Option<u64>,
}

impl AnalysisRun {
    pub fn resolve(deterministic: bool, seed: Option<u64>, default_seed: u64) -> Self {
        Self {
            seed: deterministic.then(|| seed.unwrap_or(default_seed)),
        }
    }

    pub fn is_deterministic(&self) -> bool {
        self.seed.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ReverseEngineeringService {
    structure: StructureAnalyzer,
    constraint: ConstraintDetector,
    tone: ToneClassifier,
    format: FormatDetector,
    reasoning: ReasoningDepthEstimator,
    injection: PromptInjectionDetector,
    ensemble: ScoringEnsemble,
    default_seed: u64,
}

impl Default for ReverseEngineeringService {
    fn default() -> Self {
        Self::new(DEFAULT_INJECTION_THRESHOLD, DEFAULT_SEED)
    }
}

impl ReverseEngineeringService {
    pub fn new(injection_threshold: usize, default_seed: u64) -> Self {
        Self {
            structure: StructureAnalyzer::new(),
            constraint: ConstraintDetector::new(),
            tone: ToneClassifier::new(),
            format: FormatDetector::new(),
            reasoning: ReasoningDepthEstimator::new(),
            injection: PromptInjectionDetector::new(injection_threshold),
            ensemble: ScoringEnsemble::new(),
            default_seed,
        }
    }

    pub fn from_config(config: &crate::config::ServiceConfig) -> Self {
        Self::new(config.injection_threshold, config.default_seed)
    }

    /// Runs every analyzer over `text` and returns their signals
    pub fn collect_signals(&self, text: &str) -> Signals {
        Signals {
            structure: self.structure.analyze(text),
            constraints: self.constraint.analyze(text),
            tone: self.tone.analyze(text),
            format: self.format.analyze(text),
            reasoning: self.reasoning.analyze(text),
            injection: self.injection.analyze(text),
        }
    }

    /// Analyzes `output_text` and returns the merged result
    ///
    /// Never fails: empty or degenerate input yields sentinel labels and a
    /// low confidence.
    pub fn analyze(&self, output_text: &str, deterministic: bool, seed: Option<u64>) -> AnalyzerResult {
        let start = Instant::now();
        let run = AnalysisRun::resolve(deterministic, seed, self.default_seed);
        debug!(
            text_length = output_text.len(),
            seed = ?run.seed,
            "Starting reverse analysis"
        );

        let signals = self.collect_signals(output_text);
        let result = self.ensemble.merge(&signals);

        debug!(
            confidence = result.confidence_score,
            injection = signals.injection.suspected_injection,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Reverse analysis complete"
        );
        result
    }

    /// Analyzes `output_text` and stamps the boundary-owned fields
    pub fn reverse(
        &self,
        output_text: &str,
        request_id: &str,
        deterministic: bool,
        seed: Option<u64>,
        cached: bool,
    ) -> ReverseResponse {
        let result = self.analyze(output_text, deterministic, seed);
        ReverseResponse::new(result, request_id, cached)
    }

    pub fn injection_threshold(&self) -> usize {
        self.injection.threshold()
    }

    /// Names of the analyzers in pipeline order
    pub fn analyzer_names(&self) -> [&'static str; 6] {
        [
            self.structure.name(),
            self.constraint.name(),
            self.tone.name(),
            self.format.name(),
            self.reasoning.name(),
            self.injection.name(),
        ]
    }
}
