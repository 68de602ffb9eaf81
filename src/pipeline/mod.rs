//! Analysis pipeline: analyzer orchestration and ensemble scoring

pub mod ensemble;
pub mod service;

pub use ensemble::{ScoringEnsemble, Signals};
pub use service::{AnalysisRun, ReverseEngineeringService};
