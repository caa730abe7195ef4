//! # Configuration Validation
//!
//! Provides validation for all configuration structures using the `validator` crate.

use crate::config::Config;
use validator::Validate;

/// Validate configuration structure.
///
/// ## Validation Rules
/// ### Rate limit
/// - `max_requests`: 1-10000
/// - `window_ms`: at least 1000
/// - `sweep_interval_secs`: 1-3600
///
/// ### External services
/// - `base_url`: must be a URL
/// - `timeout_secs`: 1-600
/// - `poll_attempts`: 0-60, `poll_interval_secs`: 0-300
/// - `fallback_url_template`: when set, must contain `{id}`
///
/// ### Observability
/// - `logging_level`: must be "trace", "debug", "info", "warn", or "error"
pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}
