//! Result records emitted by the analysis pipeline

pub mod schema;

pub use schema::{
    AnalyzerResult, AnalyzerScores, Explainability, PromptStyle, ReverseResponse, TaskType,
    TemperatureEstimate,
};
