//! Formatting signature detection

use super::{split_lines, Analyzer};
use crate::output::schema::PLAIN_TEXT_FORMAT;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatSignal {
    pub format_markers: Vec<String>,
    pub trace: String,
}

impl FormatSignal {
    /// True when some formatting signature beyond plain text was found
    pub fn is_structured(&self) -> bool {
        !self.format_markers.iter().any(|m| m == PLAIN_TEXT_FORMAT)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetector;

impl FormatDetector {
    pub fn new() -> Self {
        Self
    }
}

/// Two leading digits followed by `.` or `)`, e.g. `10.` or `01)`
fn is_numbered_line(line: &str) -> bool {
    let mut chars = line.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), Some(c)) => {
            a.is_ascii_digit() && b.is_ascii_digit() && (c == '.' || c == ')')
        }
        _ => false,
    }
}

impl Analyzer for FormatDetector {
    type Signal = FormatSignal;

    fn name(&self) -> &'static str {
        "format"
    }

    fn analyze(&self, text: &str) -> FormatSignal {
        let lines: Vec<&str> = split_lines(text)
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let mut markers = Vec::new();
        if text.contains("```") {
            markers.push("markdown_code_block");
        }
        if lines
            .iter()
            .any(|line| line.starts_with("- ") || line.starts_with("* "))
        {
            markers.push("bullet_list");
        }
        if lines.iter().any(|line| is_numbered_line(line)) {
            markers.push("numbered_steps");
        }
        if text.contains('{') && text.contains('}') && text.contains('"') {
            markers.push("json_like");
        }
        if markers.is_empty() {
            markers.push(PLAIN_TEXT_FORMAT);
        }

        let format_markers: Vec<String> = markers.into_iter().map(String::from).collect();
        let trace = format!("format_markers={}", format_markers.join(","));
        FormatSignal {
            format_markers,
            trace,
        }
    }
}
