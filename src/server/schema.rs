//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::config::{MAX_SEED, MIN_INPUT_CHARS};
use crate::output::schema::ReverseResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseRequest {
    pub output_text: String,
    #[serde(default)]
    pub deterministic: Option<bool>,
    #[serde(default)]
    pub seed: Option<i64>,
}

impl ReverseRequest {
    pub fn new(output_text: impl Into<String>) -> Self {
        Self {
            output_text: output_text.into(),
            deterministic: None,
            seed: None,
        }
    }

    /// Checks length and seed bounds, then trims the text
    ///
    /// Lengths are measured in characters on the untrimmed text.
    pub fn validate(mut self, max_input_chars: usize) -> Result<Self, ValidationError> {
        let chars = self.output_text.chars().count();
        if chars < MIN_INPUT_CHARS {
            return Err(ValidationError::TextTooShort {
                min: MIN_INPUT_CHARS,
            });
        }
        if chars > max_input_chars {
            return Err(ValidationError::TextTooLong {
                max: max_input_chars,
            });
        }
        if let Some(seed) = self.seed {
            if seed < 0 || seed as u64 > MAX_SEED {
                return Err(ValidationError::SeedOutOfRange { max: MAX_SEED });
            }
        }

        let trimmed = self.output_text.trim();
        if trimmed.len() != self.output_text.len() {
            self.output_text = trimmed.to_string();
        }
        Ok(self)
    }

    /// Seed after validation, as the pipeline expects it
    pub fn seed(&self) -> Option<u64> {
        self.seed.and_then(|s| u64::try_from(s).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReverseRequest {
    pub items: Vec<ReverseRequest>,
}

impl BatchReverseRequest {
    pub fn validate(
        self,
        max_batch_items: usize,
        max_input_chars: usize,
    ) -> Result<Self, ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if self.items.len() > max_batch_items {
            return Err(ValidationError::BatchTooLarge {
                max: max_batch_items,
            });
        }
        let items = self
            .items
            .into_iter()
            .map(|item| item.validate(max_input_chars))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { items })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReverseResponse {
    pub results: Vec<ReverseResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub app: String,
    pub environment: String,
}
