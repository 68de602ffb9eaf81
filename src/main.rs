use prompt_reverse::agent::PromptReverseAgent;
use prompt_reverse::cli::commands::{
    AnalyzeArgs, BenchArgs, CliArgs, Commands, ConfigArgs, EvaluateArgs, GenerateDatasetArgs,
    InvokeArgs, ServeArgs,
};
use prompt_reverse::cli::output::{OutputFormat, OutputFormatter};
use prompt_reverse::config::ServiceConfig;
use prompt_reverse::eval::{self, BenchOptions};
use prompt_reverse::pipeline::ReverseEngineeringService;
use prompt_reverse::util::logging::{self, LoggingConfig};
use prompt_reverse::{server, NAME, VERSION};

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::process;
use std::time::Duration;
use tracing::{debug, error, info, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    let config = ServiceConfig::default();
    init_logging_from_args(&args, &config);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Serve(serve_args) => handle_serve(serve_args, config).await,
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, &config),
        Commands::Invoke(invoke_args) => handle_invoke(invoke_args, &config),
        Commands::Evaluate(evaluate_args) => handle_evaluate(evaluate_args, &config),
        Commands::GenerateDataset(gen_args) => handle_generate_dataset(gen_args, args.quiet),
        Commands::Bench(bench_args) => handle_bench(bench_args, args.quiet).await,
        Commands::Config(config_args) => handle_config(config_args, &config),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &ServiceConfig) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        logging::parse_level(&config.log_level)
    };

    let logging_config = match args.command {
        Commands::Serve(_) if config.app_env == "production" => LoggingConfig {
            level,
            ..LoggingConfig::production()
        },
        // The service logs to stdout, as JSON when configured
        Commands::Serve(_) => LoggingConfig {
            use_json: config.log_json,
            ..LoggingConfig::with_level(level)
        },
        // Other commands keep stdout for their results
        _ => LoggingConfig::cli(level),
    };
    logging::init_logging(logging_config);
}

fn read_input(inline: Option<&str>, file: Option<&std::path::Path>) -> Result<String> {
    if let Some(text) = inline {
        return Ok(text.to_string());
    }
    if let Some(path) = file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    Ok(buffer)
}

async fn handle_serve(args: &ServeArgs, mut config: ServiceConfig) -> i32 {
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your PROMPT_REVERSE_* environment variables.");
        return 1;
    }

    info!(
        app = %config.app_name,
        environment = %config.app_env,
        "Starting {} v{}",
        NAME,
        VERSION
    );
    match server::serve(config).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Server failed: {:#}", e);
            1
        }
    }
}

fn handle_analyze(args: &AnalyzeArgs, config: &ServiceConfig) -> i32 {
    let text = match read_input(args.text.as_deref(), args.file.as_deref()) {
        Ok(text) => text,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };
    let text = text.trim();
    if text.is_empty() {
        error!("No text to analyze");
        return 1;
    }

    let service = ReverseEngineeringService::from_config(config);
    let deterministic = args.deterministic || config.deterministic_default;
    let result = service.analyze(text, deterministic, args.seed);
    debug!(confidence = result.confidence_score, "Analysis complete");

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format(&result) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

fn handle_invoke(args: &InvokeArgs, config: &ServiceConfig) -> i32 {
    let raw = match read_input(args.payload.as_deref(), None) {
        Ok(raw) => raw,
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    };
    let payload: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Payload is not valid JSON: {}", e);
            return 1;
        }
    };

    let envelope = PromptReverseAgent::new(config).invoke(&payload);
    match serde_json::to_string_pretty(&envelope) {
        Ok(output) => {
            println!("{}", output);
            if envelope["ok"].as_bool().unwrap_or(false) {
                0
            } else {
                1
            }
        }
        Err(e) => {
            error!("Failed to format output: {}", e);
            1
        }
    }
}

fn handle_evaluate(args: &EvaluateArgs, config: &ServiceConfig) -> i32 {
    let service = ReverseEngineeringService::from_config(config);
    let report = match eval::evaluate_dataset(&args.dataset, &service) {
        Ok(report) => report,
        Err(e) => {
            error!("Evaluation failed: {}", e);
            return 1;
        }
    };

    let format: OutputFormat = args.format.into();
    match OutputFormatter::new(format).format_evaluation(&report) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

fn handle_generate_dataset(args: &GenerateDatasetArgs, quiet: bool) -> i32 {
    let rows = eval::generate_rows(args.rows, args.seed);
    if let Err(e) = eval::write_dataset(&args.output, &rows) {
        error!("Failed to write dataset: {}", e);
        return 1;
    }

    info!(path = %args.output.display(), rows = rows.len(), "Dataset generated");
    if !quiet {
        println!("Generated {} rows at {}", rows.len(), args.output.display());
    }
    0
}

async fn handle_bench(args: &BenchArgs, quiet: bool) -> i32 {
    let options = BenchOptions {
        base_url: args.base_url.clone(),
        requests: args.requests,
        concurrency: args.concurrency,
        timeout: Duration::from_secs(args.timeout),
        show_progress: !quiet,
    };

    let report = match eval::run_benchmark(&options).await {
        Ok(report) => report,
        Err(e) => {
            error!("Benchmark failed: {:#}", e);
            eprintln!("\nIs the service running at {}?", args.base_url);
            return 1;
        }
    };

    match OutputFormatter::new(OutputFormat::Json).format_bench(&report) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

fn handle_config(args: &ConfigArgs, config: &ServiceConfig) -> i32 {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
    }

    match OutputFormatter::new(args.format.into()).format_config(config) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}
