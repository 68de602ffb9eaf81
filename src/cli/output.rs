//! Output formatting for multiple formats
//!
//! Results can be printed as JSON, YAML or human-readable text. JSON and YAML
//! are the serde representation of the value; the human format is a compact
//! report.
//!
//! # Example
//!
//! ```
//! use prompt_reverse::cli::output::{OutputFormat, OutputFormatter};
//! use prompt_reverse::pipeline::ReverseEngineeringService;
//!
//! let result = ReverseEngineeringService::default().analyze("Return JSON only.", false, None);
//! let output = OutputFormatter::new(OutputFormat::Json).format(&result).unwrap();
//! assert!(output.contains("\"confidence_score\""));
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ServiceConfig;
use crate::eval::{BenchReport, EvaluationReport};
use crate::output::schema::AnalyzerResult;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Confidence at or above which the report header shows a check mark
const HIGH_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an analysis result
    pub fn format(&self, result: &AnalyzerResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(result),
            OutputFormat::Yaml => to_yaml(result),
            OutputFormat::Human => Ok(self.format_human(result)),
        }
    }

    pub fn format_config(&self, config: &ServiceConfig) -> Result<String> {
        let map: BTreeMap<String, String> = config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => to_json(&map),
            OutputFormat::Yaml => to_yaml(&map),
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    pub fn format_evaluation(&self, report: &EvaluationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string(report).context("Failed to serialize report to JSON")
            }
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Human => Ok(format!(
                "Evaluation\n{}\n\nSamples:         {}\nAvg confidence:  {:.4}\nRisk flag rate:  {:.4}\n",
                RULE, report.samples, report.avg_confidence, report.risk_flag_rate
            )),
        }
    }

    pub fn format_bench(&self, report: &BenchReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string(report).context("Failed to serialize report to JSON")
            }
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Human => Ok(format!(
                "Benchmark\n{}\n\nRequests:     {} ({} concurrent)\np50:          {:.2} ms\np95:          {:.2} ms\nAverage:      {:.2} ms\nThroughput:   {:.2} req/s\n",
                RULE,
                report.requests,
                report.concurrency,
                report.p50_ms,
                report.p95_ms,
                report.avg_ms,
                report.rps
            )),
        }
    }

    fn format_human(&self, result: &AnalyzerResult) -> String {
        let mut output = String::new();

        if result.explainability.has_risk() {
            output.push_str("\u{26A0} Prompt Reverse Engineering Result (Risk Flags)\n");
        } else if result.confidence_score >= HIGH_CONFIDENCE {
            output.push_str("\u{2713} Prompt Reverse Engineering Result\n");
        } else {
            output.push_str("Prompt Reverse Engineering Result\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Inferred Prompt:  {}\n\n", result.inferred_prompt));
        output.push_str(&format!("Style:            {}\n", result.prompt_style));
        output.push_str(&format!("Task:             {}\n", result.task_type));
        output.push_str(&format!("Temperature:      {}\n", result.temperature_estimate));
        output.push_str(&format!(
            "Constraints:      {}\n\n",
            result.constraints_detected.join(", ")
        ));

        output.push_str("Analyzer Scores:\n");
        let entries = result.analyzer_scores.entries();
        for (i, (name, score)) in entries.iter().enumerate() {
            let connector = if i == entries.len() - 1 {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            output.push_str(&format!("{}\u{2500} {:<17} {:.2}\n", connector, name, score));
        }
        output.push('\n');

        let filled = ((result.confidence_score * 10.0) as usize).min(10);
        let bar = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled);
        output.push_str(&format!(
            "Confidence: {} {}%\n\n",
            bar,
            (result.confidence_score * 100.0).round() as u8
        ));

        output.push_str(&format!("Summary: {}\n", result.explainability.summary));
        if result.explainability.has_risk() {
            output.push_str("\n\u{26A0} Risk Flags:\n");
            for flag in &result.explainability.risk_flags {
                output.push_str(&format!("  - {}\n", flag));
            }
        }

        output.push_str("\nReasoning Trace:\n");
        for step in &result.reasoning_trace {
            output.push_str(&format!("  {}\n", step));
        }

        output
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
}

fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize to YAML")
}
