//! Usage metering, per-minute quotas and billing units
//!
//! Every accepted call is charged `ceil(chars / billing_unit_chars)` units
//! (at least one) and appended to an in-memory usage log holding the most
//! recent records. The log is the hook point for an external billing provider.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;

use super::rate_limiter::RATE_WINDOW;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("user quota exceeded for {0}")]
    UserQuotaExceeded(String),

    #[error("api key quota exceeded for {0}")]
    KeyQuotaExceeded(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub request_id: String,
    pub user_id: String,
    pub api_key_id: String,
    pub billing_units: u64,
    pub chars: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct UsageState {
    user_hits: HashMap<String, Vec<Instant>>,
    key_hits: HashMap<String, Vec<Instant>>,
    log: VecDeque<UsageRecord>,
    calls: usize,
    last_sweep: Option<Instant>,
}

impl UsageState {
    /// Drops users and keys with no calls left in the window
    fn sweep(&mut self, now: Instant) {
        let due = self
            .last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= RATE_WINDOW);
        if !due {
            return;
        }
        for hits in [&mut self.user_hits, &mut self.key_hits] {
            hits.retain(|_, window| {
                trim(window, now);
                !window.is_empty()
            });
        }
        self.last_sweep = Some(now);
    }
}

/// One metered text: its character count and the request it belongs to
#[derive(Debug, Clone, Copy)]
pub struct MeteredCall<'a> {
    pub chars: usize,
    pub request_id: &'a str,
}

#[derive(Debug)]
pub struct UsageMeter {
    per_user_quota_per_minute: usize,
    per_key_quota_per_minute: usize,
    billing_unit_chars: usize,
    log_capacity: usize,
    state: Mutex<UsageState>,
}

fn trim(hits: &mut Vec<Instant>, now: Instant) {
    hits.retain(|t| now.saturating_duration_since(*t) < RATE_WINDOW);
}

fn hits_in_window(hits: &mut HashMap<String, Vec<Instant>>, id: &str, now: Instant) -> usize {
    hits.get_mut(id).map_or(0, |window| {
        trim(window, now);
        window.len()
    })
}

impl UsageMeter {
    pub fn new(
        per_user_quota_per_minute: usize,
        per_key_quota_per_minute: usize,
        billing_unit_chars: usize,
        log_capacity: usize,
    ) -> Self {
        Self {
            per_user_quota_per_minute,
            per_key_quota_per_minute,
            billing_unit_chars: billing_unit_chars.max(1),
            log_capacity: log_capacity.max(1),
            state: Mutex::new(UsageState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UsageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Billing units for a text of `chars` characters
    pub fn billing_units(&self, chars: usize) -> u64 {
        chars.div_ceil(self.billing_unit_chars).max(1) as u64
    }

    pub fn check_and_record(
        &self,
        user_id: &str,
        api_key_id: &str,
        chars: usize,
        request_id: &str,
    ) -> Result<u64, QuotaError> {
        self.check_and_record_at(user_id, api_key_id, chars, request_id, Instant::now())
    }

    pub fn check_and_record_at(
        &self,
        user_id: &str,
        api_key_id: &str,
        chars: usize,
        request_id: &str,
        now: Instant,
    ) -> Result<u64, QuotaError> {
        let call = MeteredCall { chars, request_id };
        let units = self.check_and_record_all_at(user_id, api_key_id, &[call], now)?;
        Ok(units.iter().sum())
    }

    /// Meters every call of one request, or none when a quota would be exceeded
    ///
    /// Returns the billing units charged per call.
    pub fn check_and_record_all(
        &self,
        user_id: &str,
        api_key_id: &str,
        calls: &[MeteredCall<'_>],
    ) -> Result<Vec<u64>, QuotaError> {
        self.check_and_record_all_at(user_id, api_key_id, calls, Instant::now())
    }

    pub fn check_and_record_all_at(
        &self,
        user_id: &str,
        api_key_id: &str,
        calls: &[MeteredCall<'_>],
        now: Instant,
    ) -> Result<Vec<u64>, QuotaError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.sweep(now);

        if hits_in_window(&mut state.user_hits, user_id, now) + calls.len()
            > self.per_user_quota_per_minute
        {
            return Err(QuotaError::UserQuotaExceeded(user_id.to_string()));
        }
        if hits_in_window(&mut state.key_hits, api_key_id, now) + calls.len()
            > self.per_key_quota_per_minute
        {
            return Err(QuotaError::KeyQuotaExceeded(api_key_id.to_string()));
        }

        let timestamp = Utc::now();
        let mut charged = Vec::with_capacity(calls.len());
        for call in calls {
            state.user_hits.entry(user_id.to_string()).or_default().push(now);
            state.key_hits.entry(api_key_id.to_string()).or_default().push(now);

            let billing_units = self.billing_units(call.chars);
            if state.log.len() == self.log_capacity {
                state.log.pop_front();
            }
            state.log.push_back(UsageRecord {
                request_id: call.request_id.to_string(),
                user_id: user_id.to_string(),
                api_key_id: api_key_id.to_string(),
                billing_units,
                chars: call.chars,
                timestamp,
            });
            state.calls += 1;
            charged.push(billing_units);
        }
        Ok(charged)
    }

    /// Total metered calls since start
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    /// Most recent usage records, oldest first
    pub fn usage_log(&self) -> Vec<UsageRecord> {
        self.lock().log.iter().cloned().collect()
    }

    /// Number of users and API keys currently holding window state
    pub fn tracked_identities(&self) -> usize {
        let state = self.lock();
        state.user_hits.len() + state.key_hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use yare::parameterized;

    #[parameterized(
        empty = { 0, 1 },
        one_char = { 1, 1 },
        exact_unit = { 1000, 1 },
        just_over = { 1001, 2 },
        several = { 3500, 4 },
    )]
    fn test_billing_units(chars: usize, expected: u64) {
        let meter = UsageMeter::new(10, 10, 1000, 100);
        assert_eq!(meter.billing_units(chars), expected);
    }

    #[test]
    fn test_billing_unit_is_floored_at_one() {
        let meter = UsageMeter::new(10, 10, 0, 100);
        assert_eq!(meter.billing_units(7), 7);
    }

    #[test]
    fn test_user_quota() {
        let meter = UsageMeter::new(2, 10, 1000, 100);
        let now = Instant::now();

        assert_eq!(meter.check_and_record_at("u", "k1", 10, "r1", now), Ok(1));
        assert_eq!(meter.check_and_record_at("u", "k2", 10, "r2", now), Ok(1));
        assert_eq!(
            meter.check_and_record_at("u", "k3", 10, "r3", now),
            Err(QuotaError::UserQuotaExceeded("u".to_string()))
        );
        assert!(meter
            .check_and_record_at("u", "k3", 10, "r4", now + Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn test_key_quota_does_not_charge_user() {
        let meter = UsageMeter::new(10, 1, 1000, 100);
        let now = Instant::now();

        assert!(meter.check_and_record_at("a", "shared", 10, "r1", now).is_ok());
        assert_eq!(
            meter.check_and_record_at("b", "shared", 10, "r2", now),
            Err(QuotaError::KeyQuotaExceeded("shared".to_string()))
        );
        // "b" was rejected, so only the first call is metered
        assert_eq!(meter.call_count(), 1);
    }

    #[test]
    fn test_usage_log_records_calls() {
        let meter = UsageMeter::new(10, 10, 100, 100);
        meter.check_and_record("user", "key", 250, "req-1").unwrap();

        let log = meter.usage_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].request_id, "req-1");
        assert_eq!(log[0].billing_units, 3);
        assert_eq!(log[0].chars, 250);

        let json = serde_json::to_value(&log[0]).unwrap();
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_batch_is_metered_all_or_nothing() {
        let meter = UsageMeter::new(2, 10, 1000, 100);
        let now = Instant::now();
        let calls = [
            MeteredCall { chars: 10, request_id: "r1" },
            MeteredCall { chars: 2500, request_id: "r1" },
            MeteredCall { chars: 10, request_id: "r1" },
        ];

        assert_eq!(
            meter.check_and_record_all_at("u", "k", &calls, now),
            Err(QuotaError::UserQuotaExceeded("u".to_string()))
        );
        assert_eq!(meter.call_count(), 0);
        assert_eq!(meter.tracked_identities(), 0);

        assert_eq!(
            meter.check_and_record_all_at("u", "k", &calls[..2], now),
            Ok(vec![1, 3])
        );
        assert_eq!(meter.call_count(), 2);
    }

    #[test]
    fn test_usage_log_is_bounded() {
        let meter = UsageMeter::new(100, 100, 1000, 3);
        for i in 0..5 {
            meter
                .check_and_record("user", "key", 10, &format!("req-{}", i))
                .unwrap();
        }

        let ids: Vec<String> = meter.usage_log().into_iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec!["req-2", "req-3", "req-4"]);
        assert_eq!(meter.call_count(), 5);
    }

    #[test]
    fn test_idle_identities_are_swept() {
        let meter = UsageMeter::new(10, 10, 1000, 100);
        let start = Instant::now();

        for i in 0..20 {
            let user = format!("user-{}", i);
            meter
                .check_and_record_at(&user, &user, 10, "r", start)
                .unwrap();
        }
        assert_eq!(meter.tracked_identities(), 40);

        meter
            .check_and_record_at("late", "late-key", 10, "r", start + Duration::from_secs(61))
            .unwrap();
        assert_eq!(meter.tracked_identities(), 2);
    }
}
