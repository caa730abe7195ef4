//! # Configuration System
//!
//! Configuration for the training kit generator.
//!
//! This crate provides:
//! - Configuration structures for the pipeline and HTTP surface
//! - Configuration file loading (TOML/YAML)
//! - Environment variable overrides
//! - Configuration validation
//!
//! Precedence is env > file > defaults.

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod validator;

pub use config::{
    Config, ContentServiceConfig, DocumentServiceConfig, NotificationConfig, ObservabilityConfig,
    QuotaConfig, RateLimitConfig, ServerConfig,
};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::{ConfigLoadError, apply_env_overrides, load, load_from_env};
pub use crate::validator::validate;
pub use ::validator::Validate;
