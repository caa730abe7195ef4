//! # Configuration Structures
//!
//! All configuration structures for the training kit generator.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization with per-field defaults
//! - Use `validator` for range and format checks

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Top-level configuration aggregating every subsystem.
///
/// ## Usage
/// ```rust,no_run
/// use config::Config;
///
/// let config = Config::default();
/// println!("Listening on {}:{}", config.server.host, config.server.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    #[validate(nested)]
    pub quota: QuotaConfig,

    #[serde(default)]
    #[validate(nested)]
    pub content: ContentServiceConfig,

    #[serde(default)]
    #[validate(nested)]
    pub documents: DocumentServiceConfig,

    #[serde(default)]
    #[validate(nested)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port()
        }
    }
}

/// Fixed-window admission control.
///
/// ## Fields
/// - `max_requests`: admissions per window and key (default: 5)
/// - `window_ms`: window length in milliseconds (default: 900000, 15 minutes)
/// - `sweep_interval_secs`: cadence of the stale-entry sweeper (default: 60)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    #[validate(range(min = 1, max = 10000))]
    pub max_requests: u32,

    #[serde(default = "default_window_ms")]
    #[validate(range(min = 1000))]
    pub window_ms: u64,

    #[serde(default = "default_sweep_interval_secs")]
    #[validate(range(min = 1, max = 3600))]
    pub sweep_interval_secs: u64
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    900_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval_secs()
        }
    }
}

impl RateLimitConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Lifetime generation quota per requester.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct QuotaConfig {
    #[serde(default = "default_max_free_generations")]
    #[validate(range(min = 1))]
    pub max_free_generations: u32
}

fn default_max_free_generations() -> u32 {
    3
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_free_generations: default_max_free_generations()
        }
    }
}

/// Text-generation service (Gemini `generateContent`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ContentServiceConfig {
    #[serde(default = "default_content_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_content_model")]
    #[validate(length(min = 1, max = 100))]
    pub model: String,

    #[serde(default = "default_content_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64
}

fn default_content_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_content_model() -> String {
    "gemini-pro".to_string()
}

fn default_content_timeout_secs() -> u64 {
    60
}

impl Default for ContentServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_content_base_url(),
            api_key: None,
            model: default_content_model(),
            timeout_secs: default_content_timeout_secs()
        }
    }
}

impl ContentServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Document-generation service (Gamma generations API).
///
/// ## Fields
/// - `timeout_secs`: deadline of the creation call (default: 90)
/// - `poll_attempts` / `poll_interval_secs`: quick-poll budget (6 x 10s)
/// - `max_content_length`: pre-validation limit in characters (50000)
/// - `fallback_url_template`: URL pattern for artifacts still pending after
///   polling; `{id}` is replaced by the generation id. `None` records only
///   the identifier.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct DocumentServiceConfig {
    #[serde(default = "default_documents_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_documents_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_attempts")]
    #[validate(range(max = 60))]
    pub poll_attempts: u32,

    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(max = 300))]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_content_length")]
    #[validate(range(min = 1))]
    pub max_content_length: usize,

    #[serde(default = "default_language")]
    #[validate(length(min = 2, max = 10))]
    pub language: String,

    #[serde(default)]
    pub theme: Option<String>,

    #[serde(default = "default_fallback_url_template")]
    #[validate(custom(function = "validate_fallback_template"))]
    pub fallback_url_template: Option<String>
}

fn default_documents_base_url() -> String {
    "https://public-api.gamma.app/v0.2/generations".to_string()
}

fn default_documents_timeout_secs() -> u64 {
    90
}

fn default_poll_attempts() -> u32 {
    6
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_content_length() -> usize {
    50_000
}

fn default_language() -> String {
    "en".to_string()
}

fn default_fallback_url_template() -> Option<String> {
    Some("https://gamma.app/docs/{id}".to_string())
}

fn validate_fallback_template(value: &str) -> Result<(), validator::ValidationError> {
    if value.contains("{id}") {
        Ok(())
    } else {
        Err(validator::ValidationError::new(
            "Fallback URL template must contain {id}"
        ))
    }
}

impl Default for DocumentServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_documents_base_url(),
            api_key: None,
            timeout_secs: default_documents_timeout_secs(),
            poll_attempts: default_poll_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
            max_content_length: default_max_content_length(),
            language: default_language(),
            theme: None,
            fallback_url_template: default_fallback_url_template()
        }
    }
}

impl DocumentServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Outbound email notifications.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_notification_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_notification_from")]
    #[validate(length(min = 3, max = 320))]
    pub from: String
}

fn default_notification_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_notification_from() -> String {
    "Keystone Kaizen <noreply@keystonekaizen.com>".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_notification_base_url(),
            api_key: None,
            from: default_notification_from()
        }
    }
}

/// Logging and metrics.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_logging_level")]
    #[validate(custom(function = "validate_logging_level"))]
    pub logging_level: String,

    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool
}

fn default_logging_level() -> String {
    "info".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn validate_logging_level(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(validator::ValidationError::new("Invalid logging level"))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_level: default_logging_level(),
            metrics_enabled: default_metrics_enabled()
        }
    }
}
