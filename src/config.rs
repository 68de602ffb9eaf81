//! Configuration management for prompt-reverse
//!
//! Settings are loaded from environment variables with sensible defaults.
//! They cover the HTTP listener, input bounds, cache sizing, abuse limits,
//! usage metering and the analysis pipeline itself.
//!
//! # Environment Variables
//!
//! ## Service
//! - `PROMPT_REVERSE_APP_NAME`: Display name - default: "Prompt Reverse Engineer"
//! - `PROMPT_REVERSE_ENV`: Deployment environment - default: "development"
//! - `PROMPT_REVERSE_LOG_LEVEL`: Logging level - default: "info"
//! - `PROMPT_REVERSE_LOG_JSON`: JSON log lines (true|false) - default: "false"
//! - `PROMPT_REVERSE_HOST` / `PROMPT_REVERSE_PORT`: Listener - default: 0.0.0.0:8000
//! - `PROMPT_REVERSE_REQUEST_TIMEOUT`: Timeout in seconds - default: "30"
//! - `PROMPT_REVERSE_TRUST_FORWARDED_FOR`: Key clients on `x-forwarded-for`
//!   (only behind a trusted proxy) - default: "false"
//!
//! ## Input bounds
//! - `PROMPT_REVERSE_MAX_INPUT_CHARS`: Max characters per text - default: "12000"
//! - `PROMPT_REVERSE_MAX_BATCH_ITEMS`: Max items per batch - default: "20"
//!
//! ## Cache and limits
//! - `PROMPT_REVERSE_CACHE_TTL`: Cache TTL in seconds - default: "300"
//! - `PROMPT_REVERSE_CACHE_MAX_ENTRIES`: Cache capacity - default: "1024"
//! - `PROMPT_REVERSE_MAX_REQUESTS_PER_MINUTE`: Per-client requests - default: "60"
//! - `PROMPT_REVERSE_MAX_UNIQUE_TEXTS_PER_MINUTE`: Per-client distinct texts - default: "30"
//! - `PROMPT_REVERSE_USER_QUOTA_PER_MINUTE`: Per-user metered calls - default: "120"
//! - `PROMPT_REVERSE_KEY_QUOTA_PER_MINUTE`: Per-API-key metered calls - default: "240"
//! - `PROMPT_REVERSE_BILLING_UNIT_CHARS`: Characters per billing unit - default: "1000"
//! - `PROMPT_REVERSE_USAGE_LOG_MAX_ENTRIES`: Usage records kept in memory - default: "10000"
//!
//! ## Analysis
//! - `PROMPT_REVERSE_DETERMINISTIC`: Default determinism flag - default: "false"
//! - `PROMPT_REVERSE_DEFAULT_SEED`: Seed used when none is supplied - default: "1337"
//! - `PROMPT_REVERSE_INJECTION_THRESHOLD`: Categories needed to flag injection - default: "2"
//!
//! # Example
//!
//! ```no_run
//! use prompt_reverse::ServiceConfig;
//! use std::env;
//!
//! env::set_var("PROMPT_REVERSE_PORT", "9000");
//!
//! let config = ServiceConfig::default();
//! config.validate().expect("Invalid configuration");
//! assert_eq!(config.port, 9000);
//! ```

use crate::analyzers::DEFAULT_INJECTION_THRESHOLD;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_APP_NAME: &str = "Prompt Reverse Engineer";
const DEFAULT_APP_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;
const DEFAULT_MAX_BATCH_ITEMS: usize = 20;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;
const DEFAULT_MAX_REQUESTS_PER_MINUTE: usize = 60;
const DEFAULT_MAX_UNIQUE_TEXTS_PER_MINUTE: usize = 30;
const DEFAULT_USER_QUOTA_PER_MINUTE: usize = 120;
const DEFAULT_KEY_QUOTA_PER_MINUTE: usize = 240;
const DEFAULT_BILLING_UNIT_CHARS: usize = 1000;
const DEFAULT_USAGE_LOG_MAX_ENTRIES: usize = 10_000;

/// Seed used for deterministic runs that do not supply one
pub const DEFAULT_SEED: u64 = 1337;

/// Shortest text accepted by the API
pub const MIN_INPUT_CHARS: usize = 20;

/// Largest seed accepted by the API
pub const MAX_SEED: u64 = 2_147_483_647;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Runtime settings for the service, CLI and evaluation tooling
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub app_name: String,
    pub app_env: String,
    pub log_level: String,
    pub log_json: bool,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub trust_forwarded_for: bool,

    pub max_input_chars: usize,
    pub max_batch_items: usize,

    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub max_requests_per_minute: usize,
    pub max_unique_texts_per_minute: usize,
    pub per_user_quota_per_minute: usize,
    pub per_key_quota_per_minute: usize,
    pub billing_unit_chars: usize,
    pub usage_log_max_entries: usize,

    pub deterministic_default: bool,
    pub default_seed: u64,
    pub injection_threshold: usize,
}

impl Default for ServiceConfig {
    /// Loads configuration from `PROMPT_REVERSE_*` environment variables
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    /// Built-in defaults, ignoring the environment
    pub fn baseline() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            app_env: DEFAULT_APP_ENV.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            trust_forwarded_for: false,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            max_unique_texts_per_minute: DEFAULT_MAX_UNIQUE_TEXTS_PER_MINUTE,
            per_user_quota_per_minute: DEFAULT_USER_QUOTA_PER_MINUTE,
            per_key_quota_per_minute: DEFAULT_KEY_QUOTA_PER_MINUTE,
            billing_unit_chars: DEFAULT_BILLING_UNIT_CHARS,
            usage_log_max_entries: DEFAULT_USAGE_LOG_MAX_ENTRIES,
            deterministic_default: false,
            default_seed: DEFAULT_SEED,
            injection_threshold: DEFAULT_INJECTION_THRESHOLD,
        }
    }

    /// Baseline defaults overridden by any `PROMPT_REVERSE_*` variables set
    ///
    /// Unparseable values fall back to the default for that field.
    pub fn from_env() -> Self {
        let base = Self::baseline();
        Self {
            app_name: env::var("PROMPT_REVERSE_APP_NAME").unwrap_or(base.app_name),
            app_env: env::var("PROMPT_REVERSE_ENV").unwrap_or(base.app_env),
            log_level: env::var("PROMPT_REVERSE_LOG_LEVEL")
                .unwrap_or(base.log_level)
                .to_lowercase(),
            log_json: env_or("PROMPT_REVERSE_LOG_JSON", base.log_json),
            host: env::var("PROMPT_REVERSE_HOST").unwrap_or(base.host),
            port: env_or("PROMPT_REVERSE_PORT", base.port),
            request_timeout_secs: env_or("PROMPT_REVERSE_REQUEST_TIMEOUT", base.request_timeout_secs),
            trust_forwarded_for: env_or(
                "PROMPT_REVERSE_TRUST_FORWARDED_FOR",
                base.trust_forwarded_for,
            ),
            max_input_chars: env_or("PROMPT_REVERSE_MAX_INPUT_CHARS", base.max_input_chars),
            max_batch_items: env_or("PROMPT_REVERSE_MAX_BATCH_ITEMS", base.max_batch_items),
            cache_ttl_secs: env_or("PROMPT_REVERSE_CACHE_TTL", base.cache_ttl_secs),
            cache_max_entries: env_or("PROMPT_REVERSE_CACHE_MAX_ENTRIES", base.cache_max_entries),
            max_requests_per_minute: env_or(
                "PROMPT_REVERSE_MAX_REQUESTS_PER_MINUTE",
                base.max_requests_per_minute,
            ),
            max_unique_texts_per_minute: env_or(
                "PROMPT_REVERSE_MAX_UNIQUE_TEXTS_PER_MINUTE",
                base.max_unique_texts_per_minute,
            ),
            per_user_quota_per_minute: env_or(
                "PROMPT_REVERSE_USER_QUOTA_PER_MINUTE",
                base.per_user_quota_per_minute,
            ),
            per_key_quota_per_minute: env_or(
                "PROMPT_REVERSE_KEY_QUOTA_PER_MINUTE",
                base.per_key_quota_per_minute,
            ),
            billing_unit_chars: env_or("PROMPT_REVERSE_BILLING_UNIT_CHARS", base.billing_unit_chars),
            usage_log_max_entries: env_or(
                "PROMPT_REVERSE_USAGE_LOG_MAX_ENTRIES",
                base.usage_log_max_entries,
            ),
            deterministic_default: env_or("PROMPT_REVERSE_DETERMINISTIC", base.deterministic_default),
            default_seed: env_or("PROMPT_REVERSE_DEFAULT_SEED", base.default_seed),
            injection_threshold: env_or(
                "PROMPT_REVERSE_INJECTION_THRESHOLD",
                base.injection_threshold,
            ),
        }
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any value is out of its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.max_input_chars < MIN_INPUT_CHARS {
            return Err(ConfigError::ValidationFailed(format!(
                "Max input chars must be at least {}",
                MIN_INPUT_CHARS
            )));
        }
        if self.max_batch_items == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max batch items must be at least 1".to_string(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(ConfigError::ValidationFailed(
                "Cache must hold at least 1 entry".to_string(),
            ));
        }
        if self.max_requests_per_minute == 0 || self.max_unique_texts_per_minute == 0 {
            return Err(ConfigError::ValidationFailed(
                "Rate limits must allow at least 1 request per minute".to_string(),
            ));
        }
        if self.per_user_quota_per_minute == 0 || self.per_key_quota_per_minute == 0 {
            return Err(ConfigError::ValidationFailed(
                "Usage quotas must allow at least 1 call per minute".to_string(),
            ));
        }
        if self.usage_log_max_entries == 0 {
            return Err(ConfigError::ValidationFailed(
                "Usage log must hold at least 1 record".to_string(),
            ));
        }
        if self.injection_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "Injection threshold must be at least 1".to_string(),
            ));
        }
        if self.default_seed > MAX_SEED {
            return Err(ConfigError::ValidationFailed(format!(
                "Default seed cannot exceed {}",
                MAX_SEED
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Parses and validates a `host:port` pair into a bind address
    pub fn bind_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::ParseError {
                field: "bind address".to_string(),
                error: e.to_string(),
            })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("app_name".to_string(), self.app_name.clone());
        map.insert("app_env".to_string(), self.app_env.clone());
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("log_json".to_string(), self.log_json.to_string());
        map.insert("host".to_string(), self.host.clone());
        map.insert("port".to_string(), self.port.to_string());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "trust_forwarded_for".to_string(),
            self.trust_forwarded_for.to_string(),
        );
        map.insert("max_input_chars".to_string(), self.max_input_chars.to_string());
        map.insert("max_batch_items".to_string(), self.max_batch_items.to_string());
        map.insert("cache_ttl_secs".to_string(), self.cache_ttl_secs.to_string());
        map.insert(
            "cache_max_entries".to_string(),
            self.cache_max_entries.to_string(),
        );
        map.insert(
            "max_requests_per_minute".to_string(),
            self.max_requests_per_minute.to_string(),
        );
        map.insert(
            "max_unique_texts_per_minute".to_string(),
            self.max_unique_texts_per_minute.to_string(),
        );
        map.insert(
            "per_user_quota_per_minute".to_string(),
            self.per_user_quota_per_minute.to_string(),
        );
        map.insert(
            "per_key_quota_per_minute".to_string(),
            self.per_key_quota_per_minute.to_string(),
        );
        map.insert(
            "billing_unit_chars".to_string(),
            self.billing_unit_chars.to_string(),
        );
        map.insert(
            "usage_log_max_entries".to_string(),
            self.usage_log_max_entries.to_string(),
        );
        map.insert(
            "deterministic_default".to_string(),
            self.deterministic_default.to_string(),
        );
        map.insert("default_seed".to_string(), self.default_seed.to_string());
        map.insert(
            "injection_threshold".to_string(),
            self.injection_threshold.to_string(),
        );

        map
    }
}

impl fmt::Display for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Configuration:", self.app_name)?;
        writeln!(f, "  Environment: {}", self.app_env)?;
        writeln!(f, "  Listen: {}:{}", self.host, self.port)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Trust X-Forwarded-For: {}", self.trust_forwarded_for)?;
        writeln!(
            f,
            "  Input Bounds: {} chars, {} batch items",
            self.max_input_chars, self.max_batch_items
        )?;
        writeln!(
            f,
            "  Cache: {} entries, TTL {}s",
            self.cache_max_entries, self.cache_ttl_secs
        )?;
        writeln!(
            f,
            "  Rate Limits: {} req/min, {} unique texts/min",
            self.max_requests_per_minute, self.max_unique_texts_per_minute
        )?;
        writeln!(
            f,
            "  Quotas: {} per user/min, {} per key/min, {} chars per billing unit",
            self.per_user_quota_per_minute, self.per_key_quota_per_minute, self.billing_unit_chars
        )?;
        writeln!(
            f,
            "  Analysis: deterministic={}, seed={}, injection threshold={}",
            self.deterministic_default, self.default_seed, self.injection_threshold
        )?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_baseline_configuration() {
        let config = ServiceConfig::baseline();

        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_input_chars, DEFAULT_MAX_INPUT_CHARS);
        assert_eq!(config.max_batch_items, DEFAULT_MAX_BATCH_ITEMS);
        assert_eq!(config.default_seed, DEFAULT_SEED);
        assert_eq!(config.injection_threshold, DEFAULT_INJECTION_THRESHOLD);
        assert!(!config.deterministic_default);
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.usage_log_max_entries, DEFAULT_USAGE_LOG_MAX_ENTRIES);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("PROMPT_REVERSE_PORT", "9100"),
            EnvGuard::set("PROMPT_REVERSE_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("PROMPT_REVERSE_MAX_BATCH_ITEMS", "5"),
            EnvGuard::set("PROMPT_REVERSE_DETERMINISTIC", "true"),
            EnvGuard::set("PROMPT_REVERSE_INJECTION_THRESHOLD", "1"),
            EnvGuard::set("PROMPT_REVERSE_ENV", "production"),
            EnvGuard::set("PROMPT_REVERSE_TRUST_FORWARDED_FOR", "true"),
            EnvGuard::set("PROMPT_REVERSE_USAGE_LOG_MAX_ENTRIES", "50"),
        ];

        let config = ServiceConfig::default();

        assert_eq!(config.port, 9100);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_batch_items, 5);
        assert!(config.deterministic_default);
        assert_eq!(config.injection_threshold, 1);
        assert_eq!(config.app_env, "production");
        assert!(config.trust_forwarded_for);
        assert_eq!(config.usage_log_max_entries, 50);
    }

    #[test]
    #[serial]
    fn test_unparseable_values_fall_back() {
        let _guard = EnvGuard::set("PROMPT_REVERSE_CACHE_MAX_ENTRIES", "lots");

        let config = ServiceConfig::default();
        assert_eq!(config.cache_max_entries, DEFAULT_CACHE_MAX_ENTRIES);
    }

    #[test]
    fn test_configuration_validation_invalid_timeout() {
        let mut config = ServiceConfig::baseline();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_invalid_log_level() {
        let mut config = ServiceConfig::baseline();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configuration_validation_zero_threshold() {
        let mut config = ServiceConfig::baseline();
        config.injection_threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_configuration_validation_empty_usage_log() {
        let mut config = ServiceConfig::baseline();
        config.usage_log_max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_addr() {
        let mut config = ServiceConfig::baseline();
        assert_eq!(config.bind_addr().unwrap().port(), DEFAULT_PORT);

        config.host = "not a host".to_string();
        assert!(matches!(
            config.bind_addr(),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_display_map_covers_limits() {
        let map = ServiceConfig::baseline().to_display_map();
        assert_eq!(map.get("max_batch_items").map(String::as_str), Some("20"));
        assert_eq!(map.get("default_seed").map(String::as_str), Some("1337"));
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", ServiceConfig::baseline());
        assert!(display.contains("Prompt Reverse Engineer Configuration:"));
        assert!(display.contains("Rate Limits:"));
    }
}
