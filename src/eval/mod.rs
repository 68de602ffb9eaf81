//! Evaluation tooling: synthetic datasets, offline quality metrics and an
//! HTTP load benchmark

pub mod bench;
pub mod dataset;
pub mod evaluate;

pub use bench::{run_benchmark, BenchOptions, BenchReport};
pub use dataset::{generate_rows, read_dataset, write_dataset, DatasetError, DatasetRow};
pub use evaluate::{evaluate_dataset, evaluate_rows, EvaluationReport, EVAL_SEED};
