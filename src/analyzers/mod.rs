//! Heuristic analyzers
//!
//! Each analyzer is a pure function of the input text that emits one typed
//! signal. Analyzers share no state and have no ordering dependency, so the
//! pipeline may run them in any order (or concurrently) with identical
//! results. Every signal carries a `trace` string describing what matched.
//!
//! All analyzers are total: any string, including the empty string, yields a
//! valid signal with fallback labels.

pub mod constraint;
pub mod format;
pub mod injection;
pub mod reasoning;
pub mod structure;
pub mod tone;

pub use constraint::{ConstraintDetector, ConstraintSignal};
pub use format::{FormatDetector, FormatSignal};
pub use injection::{InjectionSignal, PromptInjectionDetector, DEFAULT_INJECTION_THRESHOLD};
pub use reasoning::{ReasoningDepthEstimator, ReasoningSignal};
pub use structure::{StructureAnalyzer, StructureSignal};
pub use tone::{Tone, ToneClassifier, ToneSignal};

/// Shared contract of every analyzer
pub trait Analyzer: Send + Sync {
    type Signal;

    /// Stable analyzer name used in logs
    fn name(&self) -> &'static str;

    fn analyze(&self, text: &str) -> Self::Signal;
}

/// Sums non-overlapping occurrence counts of each needle in `haystack`
pub(crate) fn count_occurrences(haystack: &str, needles: &[&str]) -> usize {
    needles
        .iter()
        .map(|needle| haystack.matches(needle).count())
        .sum()
}

/// Characters that end a line: `\n`, `\r`, vertical tab, form feed, the
/// file/group/record separators, NEL and the Unicode line/paragraph separators
const LINE_BREAKS: &[char] = &[
    '\n', '\r', '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}',
    '\u{2029}',
];

/// Splits `text` into lines on every [`LINE_BREAKS`] character
///
/// `\r\n` counts as one break and a trailing break does not start an empty
/// final line, matching [`str::lines`] for `\n`-only text.
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !LINE_BREAKS.contains(&c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// True if `haystack` contains any of `needles`
pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_occurrences_sums_per_needle() {
        assert_eq!(count_occurrences("maybe maybe might", &["maybe", "might"]), 3);
        assert_eq!(count_occurrences("aaaa", &["aa"]), 2);
        assert_eq!(count_occurrences("", &["x"]), 0);
    }

    #[test]
    fn test_split_lines_matches_str_lines_for_newlines() {
        for text in ["", "a", "a\n", "a\nb", "a\n\nb\n", "a\r\nb"] {
            assert_eq!(split_lines(text), text.lines().collect::<Vec<_>>(), "{:?}", text);
        }
    }

    #[test]
    fn test_split_lines_other_breaks() {
        assert_eq!(split_lines("a\rb\rc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("a\u{0b}b\u{0c}c\u{85}d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\u{2028}b\u{2029}"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\rb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("you are here", &["as an", "you are"]));
        assert!(!contains_any("nothing", &["as an", "you are"]));
    }
}
