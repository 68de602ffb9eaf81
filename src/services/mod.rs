//! Shared boundary state for the HTTP service: response cache, abuse
//! limits, usage metering and latency metrics

pub mod cache;
pub mod metrics;
pub mod rate_limiter;
pub mod usage;

pub use cache::TtlCache;
pub use metrics::{EndpointStats, MetricsRegistry};
pub use rate_limiter::{RateDecision, RateLimiter, RATE_WINDOW};
pub use usage::{MeteredCall, QuotaError, UsageMeter, UsageRecord};
