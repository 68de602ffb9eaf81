//! Prompt injection and jailbreak artifact detection
//!
//! A category matches when the lower-cased text contains any of its phrases.
//! Injection is suspected once the number of distinct matched categories
//! reaches the configured threshold.

use super::{contains_any, Analyzer};
use serde::Serialize;

pub const DEFAULT_INJECTION_THRESHOLD: usize = 2;

const INJECTION_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "instruction_override",
        &["ignore previous", "disregard all prior", "new instructions"],
    ),
    (
        "policy_exfiltration",
        &["system prompt", "hidden prompt", "reveal instructions"],
    ),
    ("role_hijack", &["you are now", "act as", "developer mode"]),
    (
        "secrets_access",
        &["api key", "token", "password", "credentials"],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectionSignal {
    pub suspected_injection: bool,
    pub matched_patterns: Vec<String>,
    pub trace: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptInjectionDetector {
    threshold: usize,
}

impl Default for PromptInjectionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_INJECTION_THRESHOLD)
    }
}

impl PromptInjectionDetector {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Analyzer for PromptInjectionDetector {
    type Signal = InjectionSignal;

    fn name(&self) -> &'static str {
        "injection"
    }

    fn analyze(&self, text: &str) -> InjectionSignal {
        let lower = text.to_lowercase();
        let matched_patterns: Vec<String> = INJECTION_CATEGORIES
            .iter()
            .filter(|(_, phrases)| contains_any(&lower, phrases))
            .map(|(category, _)| category.to_string())
            .collect();

        let trace = if matched_patterns.is_empty() {
            "injection_matches=none".to_string()
        } else {
            format!("injection_matches={}", matched_patterns.join(","))
        };

        InjectionSignal {
            suspected_injection: matched_patterns.len() >= self.threshold,
            matched_patterns,
            trace,
        }
    }
}
