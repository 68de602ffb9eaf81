//! Single-callable agent wrapper for marketplace integrations
//!
//! [`PromptReverseAgent::invoke`] takes a loose JSON payload and always
//! returns a JSON envelope, never an error:
//!
//! ```text
//! {"ok": true,  "data": <ReverseResponse>, "usage": {...}}
//! {"ok": false, "error": {"code": "validation_error" | "invoke_failed", "message": ...}}
//! ```
//!
//! # Example
//!
//! ```
//! use prompt_reverse::agent::PromptReverseAgent;
//! use serde_json::json;
//!
//! let agent = PromptReverseAgent::default();
//! let envelope = agent.invoke(&json!({"output_text": "Return JSON only.", "seed": 3}));
//! assert_eq!(envelope["ok"], true);
//! assert_eq!(envelope["usage"]["call_counter"], 1);
//! ```

use serde::Serialize;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::pipeline::ReverseEngineeringService;

const CHARS_PER_TOKEN: usize = 4;

/// Call and token counters reported with every successful invoke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvokeUsage {
    pub call_counter: u64,
    pub estimated_tokens: u64,
    pub estimated_tokens_total: u64,
}

#[derive(Debug, Default)]
struct TokenMeter {
    call_counter: u64,
    token_estimate_total: u64,
}

impl TokenMeter {
    fn record(&mut self, text: &str) -> InvokeUsage {
        let estimated_tokens = (text.chars().count() / CHARS_PER_TOKEN).max(1) as u64;
        self.call_counter += 1;
        self.token_estimate_total += estimated_tokens;
        InvokeUsage {
            call_counter: self.call_counter,
            estimated_tokens,
            estimated_tokens_total: self.token_estimate_total,
        }
    }
}

#[derive(Debug)]
pub struct PromptReverseAgent {
    service: Arc<ReverseEngineeringService>,
    deterministic_default: bool,
    meter: Mutex<TokenMeter>,
}

impl Default for PromptReverseAgent {
    fn default() -> Self {
        Self::new(&ServiceConfig::default())
    }
}

fn text_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn error_envelope(code: &str, message: impl Into<String>) -> Value {
    json!({
        "ok": false,
        "error": { "code": code, "message": message.into() },
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "analysis panicked".to_string()
    }
}

impl PromptReverseAgent {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            service: Arc::new(ReverseEngineeringService::from_config(config)),
            deterministic_default: config.deterministic_default,
            meter: Mutex::new(TokenMeter::default()),
        }
    }

    pub fn invoke(&self, payload: &Value) -> Value {
        let output_text = text_field(payload, "output_text").unwrap_or_default();
        let output_text = output_text.trim();
        if output_text.is_empty() {
            return error_envelope("validation_error", "output_text is required");
        }

        let deterministic = payload
            .get("deterministic")
            .and_then(Value::as_bool)
            .unwrap_or(self.deterministic_default);
        let seed = payload.get("seed").and_then(Value::as_u64);
        let request_id =
            text_field(payload, "request_id").unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(request_id = %request_id, deterministic, "Agent invoke");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.service
                .reverse(output_text, &request_id, deterministic, seed, false)
        }));
        let response = match outcome {
            Ok(response) => response,
            Err(cause) => {
                let message = panic_message(cause.as_ref());
                error!(request_id = %request_id, error = %message, "Agent invoke failed");
                return error_envelope("invoke_failed", message);
            }
        };

        let data = match serde_json::to_value(&response) {
            Ok(data) => data,
            Err(e) => return error_envelope("invoke_failed", e.to_string()),
        };
        let usage = self
            .meter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(output_text);

        json!({ "ok": true, "data": data, "usage": usage })
    }

    /// Runs [`invoke`](Self::invoke) on the blocking pool
    pub async fn invoke_async(self: Arc<Self>, payload: Value) -> Value {
        match tokio::task::spawn_blocking(move || self.invoke(&payload)).await {
            Ok(envelope) => envelope,
            Err(e) => error_envelope("invoke_failed", e.to_string()),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.meter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .call_counter
    }
}
