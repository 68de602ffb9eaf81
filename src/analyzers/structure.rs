//! Prompt structure analysis
//!
//! Infers the prompt framing style and the primary task from the output text,
//! then reconstructs a probable prompt skeleton from fixed templates.
//!
//! Style is an ordered priority chain: template placeholders beat role
//! framing, which beats chain-of-thought cues; anything else is a plain
//! instruction. Task type is inferred independently of style.

use super::{contains_any, split_lines, Analyzer};
use crate::output::schema::{PromptStyle, TaskType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const CODE_HINTS: &[&str] = &["```", "def ", "class ", "import ", "function", "algorithm"];
const ESSAY_HINTS: &[&str] = &["introduction", "conclusion", "thesis", "paragraph"];
const EXPLANATION_HINTS: &[&str] = &["explain", "overview"];
const REASONING_HINTS: &[&str] = &["step", "therefore", "because", "let's", "first,"];
const ROLE_HINTS: &[&str] = &["as an", "you are"];

/// Chain-of-thought style needs strictly more lines than this
const MIN_COT_LINES: usize = 4;

static TEMPLATE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{.*?\}\}|\[[A-Z_]+\]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureSignal {
    pub inferred_prompt: String,
    pub prompt_style: PromptStyle,
    pub task_type: TaskType,
    pub trace: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureAnalyzer;

impl StructureAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn infer_style(text: &str, lower: &str) -> (PromptStyle, bool) {
        let is_template = TEMPLATE_MARKERS.is_match(text);
        let style = if is_template {
            PromptStyle::Template
        } else if contains_any(lower, ROLE_HINTS) {
            PromptStyle::RoleBased
        } else if contains_any(lower, REASONING_HINTS)
            && split_lines(text).len() > MIN_COT_LINES
        {
            PromptStyle::ChainOfThought
        } else {
            PromptStyle::Instruction
        };
        (style, is_template)
    }

    fn infer_task_type(lower: &str) -> TaskType {
        if contains_any(lower, CODE_HINTS) {
            TaskType::Code
        } else if contains_any(lower, ESSAY_HINTS) {
            TaskType::Essay
        } else if contains_any(lower, EXPLANATION_HINTS) {
            TaskType::Explanation
        } else if contains_any(lower, REASONING_HINTS) {
            TaskType::Reasoning
        } else {
            TaskType::General
        }
    }
}

/// Opening of the reconstructed prompt for a given style
pub fn style_prefix(style: PromptStyle) -> &'static str {
    match style {
        PromptStyle::Instruction => "Instruction: ",
        PromptStyle::RoleBased => "Role: You are a domain expert. Task: ",
        PromptStyle::ChainOfThought => "Think step-by-step. Then answer. Task: ",
        PromptStyle::Template => "Template: [ROLE] [TASK] [CONSTRAINTS]. Task: ",
    }
}

/// Task sentence of the reconstructed prompt for a given task type
pub fn task_base(task: TaskType) -> &'static str {
    match task {
        TaskType::Code => "Generate production-ready code with comments and edge-case handling.",
        TaskType::Essay => "Write a structured essay with intro, body, and conclusion.",
        TaskType::Explanation => "Explain the concept clearly for an intermediate audience.",
        TaskType::Reasoning => "Solve the problem step-by-step and justify each conclusion.",
        TaskType::General => "Respond clearly and helpfully to the user request.",
    }
}

pub fn reconstruct_prompt(style: PromptStyle, task: TaskType) -> String {
    format!("{}{}", style_prefix(style), task_base(task))
}

impl Analyzer for StructureAnalyzer {
    type Signal = StructureSignal;

    fn name(&self) -> &'static str {
        "structure"
    }

    fn analyze(&self, text: &str) -> StructureSignal {
        let lower = text.to_lowercase();
        let (prompt_style, is_template) = Self::infer_style(text, &lower);
        let task_type = Self::infer_task_type(&lower);

        StructureSignal {
            inferred_prompt: reconstruct_prompt(prompt_style, task_type),
            prompt_style,
            task_type,
            trace: format!(
                "style={}, task_type={}, template_markers={}",
                prompt_style, task_type, is_template
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn analyze(text: &str) -> StructureSignal {
        StructureAnalyzer::new().analyze(text)
    }

    #[test]
    fn test_detects_code_task() {
        let signal = analyze("```python\ndef add(a,b): return a+b\n```");
        assert_eq!(signal.task_type, TaskType::Code);
        assert_eq!(signal.prompt_style, PromptStyle::Instruction);
        assert_eq!(
            signal.inferred_prompt,
            "Instruction: Generate production-ready code with comments and edge-case handling."
        );
    }

    #[test]
    fn test_template_wins_over_role_framing() {
        let signal = analyze("You are an assistant. {{ROLE}} {{TASK}} as an expert");
        assert_eq!(signal.prompt_style, PromptStyle::Template);
        assert!(signal.trace.ends_with("template_markers=true"));
    }

    #[test]
    fn test_bracketed_uppercase_is_template() {
        assert_eq!(analyze("Fill in [ROLE] here").prompt_style, PromptStyle::Template);
        // lower-case brackets are not placeholders
        assert_eq!(analyze("see [note] here").prompt_style, PromptStyle::Instruction);
    }

    #[test]
    fn test_chain_of_thought_needs_more_than_four_lines() {
        let short = "Step one\nbecause\nthree\nfour";
        assert_eq!(analyze(short).prompt_style, PromptStyle::Instruction);

        let long = "Step one\nbecause\nthree\nfour\nfive";
        assert_eq!(analyze(long).prompt_style, PromptStyle::ChainOfThought);
        assert_eq!(analyze(long).task_type, TaskType::Reasoning);
    }

    #[test]
    fn test_chain_of_thought_counts_carriage_return_lines() {
        let text = "Step one\rbecause\rthree\rfour\rfive";
        assert_eq!(analyze(text).prompt_style, PromptStyle::ChainOfThought);

        let separators = "Step one\u{2028}because\u{0c}three\u{85}four\u{1e}five";
        assert_eq!(analyze(separators).prompt_style, PromptStyle::ChainOfThought);
    }

    #[parameterized(
        essay = { "The introduction sets the thesis.", TaskType::Essay },
        explanation = { "Here is an overview of the topic.", TaskType::Explanation },
        reasoning = { "This holds because of the premise.", TaskType::Reasoning },
        general = { "Hello there, nice weather.", TaskType::General },
        code_beats_essay = { "import os in the introduction", TaskType::Code },
    )]
    fn test_task_type_priority(text: &str, expected: TaskType) {
        assert_eq!(analyze(text).task_type, expected);
    }

    #[test]
    fn test_trace_format() {
        let signal = analyze("As an expert, explain this.");
        assert_eq!(
            signal.trace,
            "style=role-based, task_type=explanation, template_markers=false"
        );
    }

    #[test]
    fn test_every_template_combination_is_non_empty() {
        let styles = [
            PromptStyle::Instruction,
            PromptStyle::RoleBased,
            PromptStyle::ChainOfThought,
            PromptStyle::Template,
        ];
        let tasks = [
            TaskType::Code,
            TaskType::Essay,
            TaskType::Explanation,
            TaskType::Reasoning,
            TaskType::General,
        ];
        for style in styles {
            for task in tasks {
                let prompt = reconstruct_prompt(style, task);
                assert!(prompt.starts_with(style_prefix(style)));
                assert!(prompt.ends_with(task_base(task)));
            }
        }
    }

    #[test]
    fn test_empty_text() {
        let signal = analyze("");
        assert_eq!(signal.prompt_style, PromptStyle::Instruction);
        assert_eq!(signal.task_type, TaskType::General);
    }
}
