//! # Environment Variable Loader
//!
//! Applies environment overrides on top of defaults or a loaded file.
//!
//! # Variables
//! - `TRAINKIT_HOST`, `TRAINKIT_PORT`: HTTP listener
//! - `TRAINKIT_LOG_LEVEL`: logging level (trace/debug/info/warn/error)
//! - `TRAINKIT_CONFIG`: optional TOML/YAML file loaded before env overrides
//! - `RATE_LIMIT_MAX_REQUESTS`, `RATE_LIMIT_WINDOW_MS`: admission window
//! - `MAX_FREE_GENERATIONS`: lifetime quota per requester
//! - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`: text generation
//! - `GAMMA_API_KEY`, `GAMMA_BASE_URL`: document generation
//! - `RESEND_API_KEY`, `RESEND_FROM_EMAIL`: email notifications; setting the
//!   key enables notifications

use crate::config::Config;
use crate::file_loader::{ConfigFileError, load_from_file};
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidVariable { key: String, reason: String },

    #[error("Configuration failed validation: {0}")]
    Invalid(#[from] validator::ValidationErrors)
}

/// Load configuration from defaults plus environment variables.
pub fn load_from_env() -> Result<Config, ConfigLoadError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Full precedence chain: defaults, then `TRAINKIT_CONFIG` file when set,
/// then environment variables. The result is validated.
pub fn load() -> Result<Config, ConfigLoadError> {
    let mut config = match env::var("TRAINKIT_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            load_from_file(Path::new(&path))?
        }
        Err(_) => Config::default()
    };
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigLoadError> {
    if let Ok(host) = env::var("TRAINKIT_HOST") {
        config.server.host = host;
    }
    if let Some(port) = parse_env("TRAINKIT_PORT")? {
        config.server.port = port;
    }
    if let Ok(level) = env::var("TRAINKIT_LOG_LEVEL") {
        config.observability.logging_level = level.to_lowercase();
    }

    if let Some(max) = parse_env("RATE_LIMIT_MAX_REQUESTS")? {
        config.rate_limit.max_requests = max;
    }
    if let Some(window) = parse_env("RATE_LIMIT_WINDOW_MS")? {
        config.rate_limit.window_ms = window;
    }
    if let Some(max) = parse_env("MAX_FREE_GENERATIONS")? {
        config.quota.max_free_generations = max;
    }

    if let Ok(key) = env::var("GEMINI_API_KEY") {
        config.content.api_key = Some(key);
    }
    if let Ok(model) = env::var("GEMINI_MODEL") {
        config.content.model = model;
    }
    if let Ok(url) = env::var("GEMINI_BASE_URL") {
        config.content.base_url = url;
    }

    if let Ok(key) = env::var("GAMMA_API_KEY") {
        config.documents.api_key = Some(key);
    }
    if let Ok(url) = env::var("GAMMA_BASE_URL") {
        config.documents.base_url = url;
    }

    if let Ok(key) = env::var("RESEND_API_KEY") {
        config.notifications.api_key = Some(key);
        config.notifications.enabled = true;
    }
    if let Ok(from) = env::var("RESEND_FROM_EMAIL") {
        config.notifications.from = from;
    }

    Ok(())
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigLoadError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigLoadError::InvalidVariable {
                key: key.to_string(),
                reason: e.to_string()
            }),
        Err(_) => Ok(None)
    }
}
