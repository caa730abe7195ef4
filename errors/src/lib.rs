//! # Training Kit Errors
//!
//! Error taxonomy for the training kit generation pipeline.
//!
//! - Uses `thiserror` for structured error definitions
//! - Every variant carries a stable machine-readable code and an HTTP status
//! - Variants only hold owned data so errors can be cloned into artifacts and
//!   job records

use std::collections::BTreeMap;
use thiserror::Error;

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors produced anywhere in the generation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>
    },

    #[error("Rate limit exceeded: retry after {reset_at_ms}")]
    RateLimited { reset_at_ms: i64 },

    #[error("Free generation limit exceeded: {used} of {max} generations used")]
    QuotaExceeded { used: u32, max: u32 },

    #[error("{service} request timed out after {timeout_ms}ms")]
    ExternalTimeout { service: String, timeout_ms: u64 },

    #[error("{service} error: {} - {body}", status_label(.status))]
    ExternalService {
        service: String,
        status: Option<u16>,
        body: String
    },

    #[error("Invalid response format from {service}: {reason}")]
    Parse { service: String, reason: String },

    #[error("Persistence error: {reason}")]
    Persistence { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "transport failure".to_string()
    }
}

impl GenerationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: BTreeMap::new()
        }
    }

    pub fn persistence(reason: impl ToString) -> Self {
        Self::Persistence {
            reason: reason.to_string()
        }
    }

    pub fn parse(service: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            service: service.to_string(),
            reason: reason.into()
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::ExternalTimeout { .. } => "EXTERNAL_TIMEOUT",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Persistence { .. } => "PERSISTENCE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR"
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::RateLimited { .. } => 429,
            Self::QuotaExceeded { .. } => 403,
            Self::ExternalTimeout { .. } => 504,
            Self::ExternalService { .. } | Self::Parse { .. } => 502,
            Self::Persistence { .. } | Self::Configuration { .. } => 500
        }
    }

    /// Errors raised before a job record exists.
    pub fn is_admission_failure(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::RateLimited { .. } | Self::QuotaExceeded { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ExternalTimeout { .. })
    }
}
