//! Sliding-window abuse guard keyed by client identity
//!
//! Two limits apply per client within a 60 second window: total requests,
//! and distinct texts (by content hash). Rejected requests are not recorded.
//!
//! Clients whose window has emptied are swept at most once per window, so the
//! map only holds clients seen in roughly the last two minutes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    TooManyRequests,
    TooManyUniqueTexts,
}

impl RateDecision {
    pub fn is_allowed(self) -> bool {
        self == RateDecision::Allowed
    }
}

#[derive(Debug, Default)]
struct ClientWindow {
    hits: VecDeque<Instant>,
    unique_texts: HashMap<String, Instant>,
}

impl ClientWindow {
    fn expire(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if within_window(oldest, now) {
                break;
            }
            self.hits.pop_front();
        }
        self.unique_texts.retain(|_, seen| within_window(*seen, now));
    }

    fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.unique_texts.is_empty()
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    clients: HashMap<String, ClientWindow>,
    last_sweep: Option<Instant>,
}

impl LimiterState {
    /// Drops clients with nothing left in their window
    fn sweep(&mut self, now: Instant) {
        let due = self
            .last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= RATE_WINDOW);
        if !due {
            return;
        }
        self.clients.retain(|_, window| {
            window.expire(now);
            !window.is_empty()
        });
        self.last_sweep = Some(now);
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    limit_per_minute: usize,
    unique_limit_per_minute: usize,
    state: Mutex<LimiterState>,
}

fn within_window(seen: Instant, now: Instant) -> bool {
    now.saturating_duration_since(seen) < RATE_WINDOW
}

impl RateLimiter {
    pub fn new(limit_per_minute: usize, unique_limit_per_minute: usize) -> Self {
        Self {
            limit_per_minute,
            unique_limit_per_minute,
            state: Mutex::new(LimiterState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allow(&self, client_key: &str, content_hash: &str) -> RateDecision {
        self.allow_at(client_key, content_hash, Instant::now())
    }

    pub fn allow_at(&self, client_key: &str, content_hash: &str, now: Instant) -> RateDecision {
        self.allow_all_at(client_key, &[content_hash], now)
    }

    /// Admits every text of one request or none of them
    pub fn allow_all(&self, client_key: &str, content_hashes: &[&str]) -> RateDecision {
        self.allow_all_at(client_key, content_hashes, Instant::now())
    }

    pub fn allow_all_at(
        &self,
        client_key: &str,
        content_hashes: &[&str],
        now: Instant,
    ) -> RateDecision {
        let mut state = self.lock();
        state.sweep(now);

        let decision = match state.clients.get_mut(client_key) {
            Some(window) => {
                window.expire(now);
                self.decide(window, content_hashes)
            }
            None => self.decide(&ClientWindow::default(), content_hashes),
        };
        if decision != RateDecision::Allowed {
            return decision;
        }

        let window = state.clients.entry(client_key.to_string()).or_default();
        for hash in content_hashes {
            window.hits.push_back(now);
            window.unique_texts.insert((*hash).to_string(), now);
        }
        RateDecision::Allowed
    }

    fn decide(&self, window: &ClientWindow, content_hashes: &[&str]) -> RateDecision {
        if window.hits.len() + content_hashes.len() > self.limit_per_minute {
            return RateDecision::TooManyRequests;
        }

        let new_texts: HashSet<&str> = content_hashes
            .iter()
            .copied()
            .filter(|hash| !window.unique_texts.contains_key(*hash))
            .collect();
        if window.unique_texts.len() + new_texts.len() > self.unique_limit_per_minute {
            return RateDecision::TooManyUniqueTexts;
        }
        RateDecision::Allowed
    }

    /// Number of clients currently holding window state
    pub fn tracked_clients(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn limit_per_minute(&self) -> usize {
        self.limit_per_minute
    }

    pub fn unique_limit_per_minute(&self) -> usize {
        self.unique_limit_per_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_limit() {
        let limiter = RateLimiter::new(2, 10);
        let now = Instant::now();

        assert!(limiter.allow_at("c", "h1", now).is_allowed());
        assert!(limiter.allow_at("c", "h1", now).is_allowed());
        assert_eq!(
            limiter.allow_at("c", "h1", now),
            RateDecision::TooManyRequests
        );
        // Other clients are tracked separately
        assert!(limiter.allow_at("other", "h1", now).is_allowed());
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new(1, 10);
        let start = Instant::now();

        assert!(limiter.allow_at("c", "h", start).is_allowed());
        assert!(!limiter
            .allow_at("c", "h", start + Duration::from_secs(59))
            .is_allowed());
        assert!(limiter
            .allow_at("c", "h", start + Duration::from_secs(60))
            .is_allowed());
    }

    #[test]
    fn test_unique_text_limit() {
        let limiter = RateLimiter::new(100, 2);
        let now = Instant::now();

        assert!(limiter.allow_at("c", "a", now).is_allowed());
        assert!(limiter.allow_at("c", "b", now).is_allowed());
        assert_eq!(
            limiter.allow_at("c", "z", now),
            RateDecision::TooManyUniqueTexts
        );
        // Repeating a text already seen is fine
        assert!(limiter.allow_at("c", "a", now).is_allowed());
        // And new texts are accepted again once the window passes
        assert!(limiter
            .allow_at("c", "z", now + RATE_WINDOW)
            .is_allowed());
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(100, 1);
        let now = Instant::now();

        assert!(limiter.allow_at("c", "a", now).is_allowed());
        for _ in 0..5 {
            assert!(!limiter.allow_at("c", "b", now).is_allowed());
        }
        assert!(limiter
            .allow_at("c", "b", now + Duration::from_secs(61))
            .is_allowed());
    }

    #[test]
    fn test_allow_all_is_all_or_nothing() {
        let limiter = RateLimiter::new(10, 1);
        let now = Instant::now();

        assert_eq!(
            limiter.allow_all_at("c", &["a", "b"], now),
            RateDecision::TooManyUniqueTexts
        );
        assert_eq!(limiter.tracked_clients(), 0);

        // Nothing from the rejected batch was recorded
        assert!(limiter.allow_at("c", "b", now).is_allowed());
    }

    #[test]
    fn test_allow_all_counts_every_item() {
        let limiter = RateLimiter::new(3, 10);
        let now = Instant::now();

        assert!(limiter.allow_all_at("c", &["a", "a"], now).is_allowed());
        assert_eq!(
            limiter.allow_all_at("c", &["a", "a"], now),
            RateDecision::TooManyRequests
        );
        assert!(limiter.allow_at("c", "a", now).is_allowed());
    }

    #[test]
    fn test_idle_clients_are_swept() {
        let limiter = RateLimiter::new(10, 10);
        let start = Instant::now();

        for i in 0..50 {
            assert!(limiter.allow_at(&format!("client-{}", i), "h", start).is_allowed());
        }
        assert_eq!(limiter.tracked_clients(), 50);

        assert!(limiter
            .allow_at("late", "h", start + Duration::from_secs(61))
            .is_allowed());
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
