//! Analysis result schema
//!
//! This module defines the records produced by the reverse-engineering
//! pipeline: the merged [`AnalyzerResult`], its explainability block, and the
//! [`ReverseResponse`] envelope that adds boundary-owned fields (request id and
//! cache flag). Every record is an immutable value built fresh per request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest confidence the calibration step can emit.
pub const MIN_CONFIDENCE: f64 = 0.03;

/// Highest confidence the calibration step can emit.
pub const MAX_CONFIDENCE: f64 = 0.99;

/// Sentinel constraint label used when no explicit constraint was found.
pub const NO_EXPLICIT_CONSTRAINTS: &str = "none-explicit";

/// Sentinel format label used when no formatting signature was found.
pub const PLAIN_TEXT_FORMAT: &str = "plain_text";

/// Sentinel risk flag used when no injection category matched.
pub const NO_RISK_FLAGS: &str = "none";

/// Framing style of the prompt that most likely produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStyle {
    Instruction,
    RoleBased,
    ChainOfThought,
    Template,
}

impl PromptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStyle::Instruction => "instruction",
            PromptStyle::RoleBased => "role-based",
            PromptStyle::ChainOfThought => "chain-of-thought",
            PromptStyle::Template => "template",
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary task the upstream prompt asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Code,
    Essay,
    Explanation,
    Reasoning,
    General,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Code => "code",
            TaskType::Essay => "essay",
            TaskType::Explanation => "explanation",
            TaskType::Reasoning => "reasoning",
            TaskType::General => "general",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated sampling temperature bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureEstimate {
    Low,
    Medium,
    High,
}

impl TemperatureEstimate {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureEstimate::Low => "low",
            TemperatureEstimate::Medium => "medium",
            TemperatureEstimate::High => "high",
        }
    }
}

impl fmt::Display for TemperatureEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-analyzer heuristic scores, each in `[0, 1]`
///
/// The scores are presentational: they are not normalized against each other.
/// Serialized as a JSON object whose keys follow the field order below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerScores {
    pub structure: f64,
    pub constraint: f64,
    pub tone: f64,
    pub format: f64,
    pub reasoning_depth: f64,
    pub injection_safety: f64,
}

impl AnalyzerScores {
    /// Returns `(name, score)` pairs in serialization order
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("structure", self.structure),
            ("constraint", self.constraint),
            ("tone", self.tone),
            ("format", self.format),
            ("reasoning_depth", self.reasoning_depth),
            ("injection_safety", self.injection_safety),
        ]
    }
}

/// Human-readable explanation attached to every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explainability {
    pub summary: String,
    pub key_signals: Vec<String>,
    pub risk_flags: Vec<String>,
}

impl Explainability {
    /// True when at least one injection category was flagged
    pub fn has_risk(&self) -> bool {
        self.risk_flags
            .first()
            .is_some_and(|flag| flag != NO_RISK_FLAGS)
    }
}

/// Merged output of the analyzer ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    pub inferred_prompt: String,
    pub prompt_style: PromptStyle,
    pub task_type: TaskType,
    pub constraints_detected: Vec<String>,
    pub temperature_estimate: TemperatureEstimate,
    pub reasoning_trace: Vec<String>,
    pub analyzer_scores: AnalyzerScores,
    pub explainability: Explainability,
    pub confidence_score: f64,
}

impl AnalyzerResult {
    /// Checks the invariants every result must hold
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&self.confidence_score) {
            anyhow::bail!(
                "Confidence score must be between {} and {}, got {}",
                MIN_CONFIDENCE,
                MAX_CONFIDENCE,
                self.confidence_score
            );
        }
        if self.inferred_prompt.is_empty() {
            anyhow::bail!("Inferred prompt cannot be empty");
        }
        if self.constraints_detected.is_empty() {
            anyhow::bail!("Detected constraints cannot be empty");
        }
        if self.explainability.risk_flags.is_empty() {
            anyhow::bail!("Risk flags cannot be empty");
        }
        for (name, score) in self.analyzer_scores.entries() {
            if !(0.0..=1.0).contains(&score) {
                anyhow::bail!("Analyzer score '{}' out of range: {}", name, score);
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize analyzer result to JSON")
    }
}

impl fmt::Display for AnalyzerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inferred prompt: {}", self.inferred_prompt)?;
        writeln!(f, "Style: {}, task: {}", self.prompt_style, self.task_type)?;
        writeln!(f, "Constraints: {}", self.constraints_detected.join(", "))?;
        writeln!(f, "Temperature: {}", self.temperature_estimate)?;
        write!(f, "Confidence: {:.2}", self.confidence_score)
    }
}

/// API-facing result: the analysis plus boundary-owned metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseResponse {
    #[serde(flatten)]
    pub result: AnalyzerResult,
    pub request_id: String,
    #[serde(default)]
    pub cached: bool,
}

impl ReverseResponse {
    pub fn new(result: AnalyzerResult, request_id: impl Into<String>, cached: bool) -> Self {
        Self {
            result,
            request_id: request_id.into(),
            cached,
        }
    }

    /// Re-stamps a cached analysis for a new request
    pub fn restamped(&self, request_id: &str) -> Self {
        Self {
            result: self.result.clone(),
            request_id: request_id.to_string(),
            cached: true,
        }
    }
}
