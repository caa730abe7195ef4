use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response}
};
use errors::GenerationError;
use kit_core::{TrainingRequest, UsageSummary};
use pipeline::telemetry::Telemetry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::errors::{ApiError, ApiResult, rate_limit_headers};
use crate::state::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub slide_deck_url: Option<String>,
    pub instructor_guide_url: Option<String>,
    pub generation_id: Uuid,
    pub provisional: bool,
    pub usage: UsageResponse,
    pub message: String
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub generations_used: u32,
    pub max_generations: u32,
    pub remaining_generations: u32,
    pub has_exceeded_limit: bool
}

impl From<UsageSummary> for UsageResponse {
    fn from(summary: UsageSummary) -> Self {
        Self {
            generations_used: summary.used,
            max_generations: summary.max,
            remaining_generations: summary.remaining,
            has_exceeded_limit: summary.has_exceeded_limit
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub email: Option<String>
}

/// Client address from proxy headers: first `x-forwarded-for` hop, then
/// `x-real-ip`, else `"unknown"`.
pub fn client_address(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn invalid_form(reason: impl ToString) -> GenerationError {
    let mut fields = BTreeMap::new();
    fields.insert("formData".to_string(), vec![reason.to_string()]);
    GenerationError::Validation {
        message: "Invalid form data".to_string(),
        fields
    }
}

/// `POST /api/generate` with body `{ "formData": TrainingRequest }`.
pub async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes
) -> ApiResult<Response> {
    let ip = client_address(&headers);
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let form = payload.get("formData").cloned().unwrap_or(Value::Null);
    let email = form
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string();
    let key = format!("generate:{email}:{ip}");

    let request: TrainingRequest = serde_json::from_value(form).map_err(|e| {
        ApiError::new(invalid_form(e), state.orchestrator.rate_limiter().snapshot(&key))
    })?;

    let outcome = state.orchestrator.generate(&request, &key).await?;
    info!(job_id = %outcome.job_id, provisional = outcome.provisional, "Training kit delivered");

    let response = GenerateResponse {
        success: true,
        slide_deck_url: outcome.artifacts.presentation_url.clone(),
        instructor_guide_url: outcome.artifacts.document_url.clone(),
        generation_id: outcome.job_id,
        provisional: outcome.provisional,
        usage: outcome.usage.into(),
        message: "Training kit generated successfully!".to_string()
    };

    Ok((rate_limit_headers(&outcome.rate_limit), Json(response)).into_response())
}

/// `GET /api/usage?email=...`
pub async fn usage_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UsageQuery>
) -> ApiResult<Response> {
    let ip = client_address(&headers);
    let limiter = state.orchestrator.rate_limiter();

    let Some(email) = query.email.filter(|e| !e.trim().is_empty()) else {
        let snapshot = limiter.snapshot(&format!("usage:{UNKNOWN_CLIENT}:{ip}"));
        return Err(ApiError::new(
            GenerationError::validation("Email parameter is required"),
            snapshot
        ));
    };

    let key = format!("usage:{email}:{ip}");
    if email.len() > 254 || !email.validate_email() {
        return Err(ApiError::new(
            GenerationError::validation("Invalid email address"),
            limiter.snapshot(&key)
        ));
    }

    let admission = limiter.admit(&key);
    if !admission.allowed {
        Telemetry::record_rate_limited();
        warn!(key = %key, "Usage lookup rate limited");
        return Err(ApiError::new(
            GenerationError::RateLimited {
                reset_at_ms: admission.info.reset_at_ms
            },
            admission.info
        ));
    }

    let summary = state
        .orchestrator
        .usage(&email)
        .await
        .map_err(|e| ApiError::new(e, admission.info))?;

    Ok((
        rate_limit_headers(&admission.info),
        Json(UsageResponse::from(summary))
    )
        .into_response())
}

pub async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render()
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response()
    }
}
