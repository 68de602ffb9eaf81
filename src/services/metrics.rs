use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Aggregate latency for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EndpointStats {
    pub count: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Default)]
struct Totals {
    count: u64,
    total_ms: f64,
}

/// In-process request counters and average latency per endpoint
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    endpoints: Mutex<BTreeMap<String, Totals>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request to `endpoint` started at `started`; returns the
    /// elapsed milliseconds
    pub fn track(&self, endpoint: &str, started: Instant) -> f64 {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.record(endpoint, elapsed_ms);
        elapsed_ms
    }

    pub fn record(&self, endpoint: &str, elapsed_ms: f64) {
        let mut endpoints = self
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let totals = endpoints.entry(endpoint.to_string()).or_default();
        totals.count += 1;
        totals.total_ms += elapsed_ms;
    }

    pub fn snapshot(&self) -> BTreeMap<String, EndpointStats> {
        let endpoints = self
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        endpoints
            .iter()
            .map(|(endpoint, totals)| {
                let avg_ms = if totals.count == 0 {
                    0.0
                } else {
                    totals.total_ms / totals.count as f64
                };
                (
                    endpoint.clone(),
                    EndpointStats {
                        count: totals.count,
                        avg_ms,
                    },
                )
            })
            .collect()
    }
}
