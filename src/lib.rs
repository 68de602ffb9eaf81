//! prompt-reverse - heuristic reverse engineering of LLM prompts
//!
//! Given a piece of text produced by a large language model, this library
//! infers the prompt that most likely produced it: framing style, task type,
//! explicit constraints, sampling temperature band and prompt-injection
//! artifacts, merged into one result with a calibrated confidence score.
//!
//! # Core Concepts
//!
//! - **Analyzers**: Six independent, deterministic text heuristics, each
//!   emitting a typed signal and a one-line trace
//! - **Ensemble**: Merges the signals into an [`AnalyzerResult`] with
//!   per-analyzer scores, explainability and logistic confidence calibration
//! - **Service**: [`ReverseEngineeringService`] runs the pipeline per call with
//!   a scoped determinism seed
//!
//! # Example Usage
//!
//! ```
//! use prompt_reverse::ReverseEngineeringService;
//!
//! let service = ReverseEngineeringService::default();
//! let result = service.analyze(
//!     "You are a senior engineer. Return JSON with at most 3 bullet points.",
//!     true,
//!     Some(1337),
//! );
//!
//! assert_eq!(result.prompt_style.as_str(), "role-based");
//! println!("{}", result.inferred_prompt);
//! ```
//!
//! # Project Structure
//!
//! - [`analyzers`]: The six heuristics behind the [`analyzers::Analyzer`] trait
//! - [`pipeline`]: Ensemble scoring and service orchestration
//! - [`output`]: Result schema
//! - [`server`]: axum HTTP API with caching, rate limiting and usage metering
//! - [`services`]: Cache, rate limiter, usage meter and metrics used by the API
//! - [`agent`]: JSON-in, JSON-out wrapper for integrations
//! - [`eval`]: Dataset generation, offline evaluation and HTTP benchmark

pub mod agent;
pub mod analyzers;
pub mod cli;
pub mod config;
pub mod eval;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod util;

pub use agent::PromptReverseAgent;
pub use config::{ConfigError, ServiceConfig};
pub use output::schema::{
    AnalyzerResult, AnalyzerScores, Explainability, PromptStyle, ReverseResponse, TaskType,
    TemperatureEstimate,
};
pub use pipeline::{ReverseEngineeringService, ScoringEnsemble};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
