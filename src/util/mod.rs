//! Shared helpers: structured logging setup and content hashing

pub mod hashing;
pub mod logging;

pub use hashing::content_hash;
pub use logging::{init_from_env, init_logging, LoggingConfig};
