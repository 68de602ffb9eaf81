//! Tone classification and temperature estimation
//!
//! Emphatic or hedging language suggests a high sampling temperature; dense
//! formal connectives suggest a low one. The first matching rule wins.

use super::{count_occurrences, Analyzer};
use crate::output::schema::TemperatureEstimate;
use serde::Serialize;
use std::fmt;

const HEDGING_WORDS: &[&str] = &["maybe", "might", "possibly", "could"];
const FORMAL_WORDS: &[&str] = &["therefore", "moreover", "hence", "in summary"];

const CREATIVE_EXCLAMATIONS: usize = 3;
const CREATIVE_HEDGES: usize = 4;
const FORMAL_MARKERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Creative,
    Formal,
    Neutral,
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tone::Creative => "creative",
            Tone::Formal => "formal",
            Tone::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneSignal {
    pub tone: Tone,
    pub temperature: TemperatureEstimate,
    pub trace: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToneClassifier;

impl ToneClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for ToneClassifier {
    type Signal = ToneSignal;

    fn name(&self) -> &'static str {
        "tone"
    }

    fn analyze(&self, text: &str) -> ToneSignal {
        let lower = text.to_lowercase();
        let exclamations = text.matches('!').count();
        let hedging = count_occurrences(&lower, HEDGING_WORDS);
        let formal = count_occurrences(&lower, FORMAL_WORDS);

        let (tone, temperature) =
            if exclamations >= CREATIVE_EXCLAMATIONS || hedging >= CREATIVE_HEDGES {
                (Tone::Creative, TemperatureEstimate::High)
            } else if formal >= FORMAL_MARKERS {
                (Tone::Formal, TemperatureEstimate::Low)
            } else {
                (Tone::Neutral, TemperatureEstimate::Medium)
            };

        ToneSignal {
            tone,
            temperature,
            trace: format!(
                "tone={}, exclamations={}, hedging={}, formal={}",
                tone, exclamations, hedging, formal
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> ToneSignal {
        ToneClassifier::new().analyze(text)
    }

    #[test]
    fn test_formal_low_temperature() {
        let signal = analyze("Therefore, moreover, hence in summary, this is formal.");
        assert_eq!(signal.tone, Tone::Formal);
        assert_eq!(signal.temperature, TemperatureEstimate::Low);
        assert_eq!(
            signal.trace,
            "tone=formal, exclamations=0, hedging=0, formal=4"
        );
    }

    #[test]
    fn test_exclamations_are_creative() {
        let signal = analyze("Wow! Amazing! Incredible!");
        assert_eq!(signal.tone, Tone::Creative);
        assert_eq!(signal.temperature, TemperatureEstimate::High);
    }

    #[test]
    fn test_hedging_is_creative() {
        let signal = analyze("Maybe it might work, possibly, or it could not.");
        assert_eq!(signal.tone, Tone::Creative);
    }

    #[test]
    fn test_creative_beats_formal() {
        let signal = analyze("Therefore! Moreover! Hence!");
        assert_eq!(signal.tone, Tone::Creative);
    }

    #[test]
    fn test_neutral_default() {
        let signal = analyze("The sky is blue.");
        assert_eq!(signal.tone, Tone::Neutral);
        assert_eq!(signal.temperature, TemperatureEstimate::Medium);
        assert_eq!(analyze("").tone, Tone::Neutral);
    }
}
