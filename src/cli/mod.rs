pub mod commands;
pub mod output;

pub use commands::{
    AnalyzeArgs, BenchArgs, CliArgs, Commands, ConfigArgs, EvaluateArgs, GenerateDatasetArgs,
    InvokeArgs, ServeArgs,
};
pub use output::{OutputFormat, OutputFormatter};
