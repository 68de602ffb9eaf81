use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::eval::bench::{DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, DEFAULT_REQUESTS};
use crate::eval::dataset::DEFAULT_DATASET_PATH;

/// Heuristic reverse engineering of the prompts behind LLM outputs
#[derive(Parser, Debug)]
#[command(
    name = "prompt-reverse",
    about = "Infer the likely prompt behind an LLM output",
    version,
    author,
    long_about = "prompt-reverse runs six deterministic heuristic analyzers over a piece of \
                  LLM-generated text and reconstructs the prompt that most likely produced it, \
                  with a calibrated confidence score and prompt-injection risk flags. It can \
                  run as an HTTP service or analyze text directly from the command line."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the HTTP service",
        long_about = "Starts the HTTP API (GET /health, POST /reverse, POST /reverse/batch, \
                      GET /metrics). Settings come from PROMPT_REVERSE_* environment variables; \
                      --host and --port override them.\n\n\
                      Examples:\n  \
                      prompt-reverse serve\n  \
                      prompt-reverse serve --port 9000"
    )]
    Serve(ServeArgs),

    #[command(
        about = "Analyze one output text",
        long_about = "Runs the analysis pipeline over text given as an argument, read from a \
                      file, or piped on stdin.\n\n\
                      Examples:\n  \
                      prompt-reverse analyze \"Step 1: ...\"\n  \
                      prompt-reverse analyze --file output.txt --format json\n  \
                      cat output.txt | prompt-reverse analyze"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Call the agent wrapper with a JSON payload",
        long_about = "Passes a JSON payload such as {\"output_text\": \"...\", \"seed\": 7} to the \
                      agent wrapper and prints its response envelope.\n\n\
                      Examples:\n  \
                      prompt-reverse invoke '{\"output_text\": \"Return JSON only.\"}'"
    )]
    Invoke(InvokeArgs),

    #[command(about = "Evaluate the pipeline over a JSONL dataset")]
    Evaluate(EvaluateArgs),

    #[command(about = "Write a synthetic JSONL dataset")]
    GenerateDataset(GenerateDatasetArgs),

    #[command(about = "Benchmark a running service")]
    Bench(BenchArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, value_name = "HOST", help = "Address to bind (overrides PROMPT_REVERSE_HOST)")]
    pub host: Option<String>,

    #[arg(long, value_name = "PORT", help = "Port to bind (overrides PROMPT_REVERSE_PORT)")]
    pub port: Option<u16>,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "TEXT", help = "Text to analyze (reads stdin when omitted)")]
    pub text: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "text",
        help = "Read the text from a file"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, help = "Run deterministically")]
    pub deterministic: bool,

    #[arg(long, value_name = "SEED", help = "Seed for deterministic runs")]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct InvokeArgs {
    #[arg(value_name = "JSON", help = "Payload (reads stdin when omitted)")]
    pub payload: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DATASET_PATH, help = "Dataset path")]
    pub dataset: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateDatasetArgs {
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DATASET_PATH, help = "Output path")]
    pub output: PathBuf,

    #[arg(long, default_value = "250", help = "Number of rows")]
    pub rows: usize,

    #[arg(long, default_value = "1337", help = "Sampling seed")]
    pub seed: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct BenchArgs {
    #[arg(long, default_value = DEFAULT_BASE_URL, help = "Base URL of the running service")]
    pub base_url: String,

    #[arg(long, default_value_t = DEFAULT_REQUESTS, help = "Total requests to send")]
    pub requests: usize,

    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, help = "Concurrent in-flight requests")]
    pub concurrency: usize,

    #[arg(long, value_name = "SECONDS", default_value = "20", help = "Per-request timeout")]
    pub timeout: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
