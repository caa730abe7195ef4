use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response}
};
use errors::GenerationError;
use kit_core::RateLimitInfo;
use pipeline::GenerationFailure;
use serde_json::{Value, json};
use thiserror::Error;

/// A pipeline error plus the rate-limit position of the request that
/// produced it.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ApiError {
    pub error: GenerationError,
    pub rate_limit: Option<RateLimitInfo>
}

impl ApiError {
    pub fn new(error: GenerationError, rate_limit: RateLimitInfo) -> Self {
        Self {
            error,
            rate_limit: Some(rate_limit)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn error_code(&self) -> &'static str {
        self.error.code()
    }

    /// Variant-specific payload under `details`.
    fn details(&self) -> Option<Value> {
        match &self.error {
            GenerationError::Validation { fields, .. } if !fields.is_empty() => {
                Some(json!({ "fields": fields }))
            }
            GenerationError::RateLimited { reset_at_ms } => Some(json!({
                "resetAt": reset_at_ms,
                "retryAfterSeconds": retry_after_seconds(*reset_at_ms)
            })),
            GenerationError::QuotaExceeded { used, max } => Some(json!({
                "generationsUsed": used,
                "maxGenerations": max
            })),
            _ => None
        }
    }

    fn message(&self) -> String {
        match &self.error {
            GenerationError::Validation { message, .. } => message.clone(),
            GenerationError::RateLimited { reset_at_ms } => format!(
                "Too many requests. Please try again in {} seconds.",
                retry_after_seconds(*reset_at_ms)
            ),
            GenerationError::QuotaExceeded { max, .. } => format!(
                "You have used all {max} free generations. Contact us for additional training \
                 kits."
            ),
            other => other.to_string()
        }
    }
}

impl From<GenerationFailure> for ApiError {
    fn from(failure: GenerationFailure) -> Self {
        Self::new(failure.error, failure.rate_limit)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.message()
            }
        });
        if let (Some(details), Some(body)) = (self.details(), error.as_object_mut()) {
            body.insert("details".to_string(), details);
        }

        let mut response = (status, Json(error)).into_response();
        if let Some(info) = &self.rate_limit {
            for (name, value) in rate_limit_headers(info) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

pub fn rate_limit_headers(info: &RateLimitInfo) -> [(HeaderName, HeaderValue); 3] {
    [
        (
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(info.limit)
        ),
        (
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from(info.remaining)
        ),
        (
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderValue::from(info.reset_epoch_seconds())
        )
    ]
}

fn retry_after_seconds(reset_at_ms: i64) -> i64 {
    let now_ms = chrono::Utc::now().timestamp_millis();
    (reset_at_ms - now_ms).max(0).div_euclid(1000) + 1
}

pub type ApiResult<T> = Result<T, ApiError>;
