//! Latency and throughput benchmark against a running service
//!
//! Fires `requests` identical `POST /reverse` calls with at most
//! `concurrency` in flight and summarizes their latencies. The server's rate
//! limits apply, so large runs need raised `PROMPT_REVERSE_MAX_REQUESTS_PER_MINUTE`.

use anyhow::{Context, Result};
use futures_util::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUESTS: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 20;
pub const BENCH_PAYLOAD: &str = "Step 1: analyze constraints. Step 2: return JSON with confidence.";

const PROGRESS_TEMPLATE: &str = "{spinner} {msg} {pos}/{len} requests ({percent}%) - {per_sec}";

#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub base_url: String,
    pub requests: usize,
    pub concurrency: usize,
    pub timeout: Duration,
    pub show_progress: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests: DEFAULT_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(20),
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchReport {
    pub requests: usize,
    pub concurrency: usize,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub avg_ms: f64,
    pub rps: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Summarizes per-request latencies (milliseconds) over a run that took
/// `total_elapsed`
///
/// p95 is the element at index `max(0, floor(n * 0.95) - 1)` of the sorted
/// latencies.
pub fn summarize(
    mut durations_ms: Vec<f64>,
    concurrency: usize,
    total_elapsed: Duration,
) -> BenchReport {
    durations_ms.sort_by(|a, b| a.total_cmp(b));
    let n = durations_ms.len();

    let p95_index = ((n as f64 * 0.95) as usize).saturating_sub(1);
    let p95 = durations_ms.get(p95_index).copied().unwrap_or(0.0);
    let avg = if n == 0 {
        0.0
    } else {
        durations_ms.iter().sum::<f64>() / n as f64
    };
    let secs = total_elapsed.as_secs_f64();

    BenchReport {
        requests: n,
        concurrency,
        p50_ms: round2(median(&durations_ms)),
        p95_ms: round2(p95),
        avg_ms: round2(avg),
        rps: if secs > 0.0 { round2(n as f64 / secs) } else { 0.0 },
    }
}

fn progress_bar(options: &BenchOptions) -> ProgressBar {
    if !options.show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(options.requests as u64);
    if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_TEMPLATE) {
        pb.set_style(style);
    }
    pb.set_message("POST /reverse");
    pb
}

async fn hit(client: &reqwest::Client, url: &str) -> Result<f64> {
    let start = Instant::now();
    client
        .post(url)
        .json(&json!({ "output_text": BENCH_PAYLOAD }))
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("{} returned an error status", url))?;
    Ok(start.elapsed().as_secs_f64() * 1000.0)
}

pub async fn run_benchmark(options: &BenchOptions) -> Result<BenchReport> {
    anyhow::ensure!(options.requests > 0, "requests must be at least 1");
    anyhow::ensure!(options.concurrency > 0, "concurrency must be at least 1");

    let client = reqwest::Client::builder()
        .timeout(options.timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let url = format!("{}/reverse", options.base_url.trim_end_matches('/'));
    let semaphore = Arc::new(Semaphore::new(options.concurrency));
    let pb = progress_bar(options);

    info!(
        url = %url,
        requests = options.requests,
        concurrency = options.concurrency,
        "Starting benchmark"
    );

    let started = Instant::now();
    let calls = (0..options.requests).map(|_| {
        let semaphore = Arc::clone(&semaphore);
        let client = &client;
        let url = url.as_str();
        let pb = &pb;
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .context("Benchmark semaphore closed")?;
            let elapsed = hit(client, url).await?;
            pb.inc(1);
            Ok::<f64, anyhow::Error>(elapsed)
        }
    });
    let durations = try_join_all(calls).await;
    let total_elapsed = started.elapsed();
    pb.finish_and_clear();

    let durations = durations?;
    debug!(elapsed_ms = total_elapsed.as_millis() as u64, "Benchmark finished");
    Ok(summarize(durations, options.concurrency, total_elapsed))
}
