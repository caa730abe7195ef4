use chrono::{DateTime, Utc};
use errors::GenerationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::catalog::{is_known_industry, is_known_topic};

pub const MIN_DURATION_MINUTES: u32 = 30;
pub const MAX_DURATION_MINUTES: u32 = 240;
pub const DURATION_STEP_MINUTES: u32 = 30;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced
}

/// Inbound generation request as submitted by a requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_duration_step"))]
pub struct TrainingRequest {
    #[validate(email(message = "Invalid email address"), length(max = 254))]
    pub email: String,

    #[validate(
        length(min = 2, max = 100, message = "Topic must be at least 2 characters"),
        custom(function = "validate_topic")
    )]
    pub topic: String,

    pub level: Level,

    #[validate(range(
        min = 30,
        max = 240,
        message = "Duration must be between 30 and 240 minutes"
    ))]
    pub duration: u32,

    #[validate(
        length(min = 2, max = 50, message = "Industry must be at least 2 characters"),
        custom(function = "validate_industry")
    )]
    pub industry: String
}

fn validate_topic(value: &str) -> Result<(), ValidationError> {
    if is_known_topic(value) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_topic").with_message("Invalid topic selected".into()))
    }
}

fn validate_industry(value: &str) -> Result<(), ValidationError> {
    if is_known_industry(value) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_industry")
            .with_message("Invalid industry selected".into()))
    }
}

fn validate_duration_step(request: &TrainingRequest) -> Result<(), ValidationError> {
    if request.duration % DURATION_STEP_MINUTES == 0 {
        Ok(())
    } else {
        Err(ValidationError::new("duration_step")
            .with_message("Duration must be in 30-minute increments".into()))
    }
}

impl TrainingRequest {
    /// Runs every field rule and folds failures into a single
    /// `GenerationError::Validation` carrying per-field messages.
    pub fn check(&self) -> Result<(), GenerationError> {
        self.validate().map_err(validation_failure)
    }

    pub fn parameters(&self) -> TrainingParameters {
        TrainingParameters {
            topic: self.topic.clone(),
            level: self.level,
            duration: self.duration,
            industry: self.industry.clone()
        }
    }
}

pub fn validation_failure(errors: ValidationErrors) -> GenerationError {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }

    GenerationError::Validation {
        message: "Invalid form data".to_string(),
        fields
    }
}

/// The generation-relevant subset of a request, stored on the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingParameters {
    pub topic: String,
    pub level: Level,
    pub duration: u32,
    pub industry: String
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Allowed moves: pending -> processing -> {completed | failed}.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    Presentation,
    Document
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobArtifacts {
    pub presentation_url: Option<String>,
    pub document_url: Option<String>,
    pub presentation_external_id: Option<String>,
    pub document_external_id: Option<String>
}

impl JobArtifacts {
    pub fn url(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Presentation => self.presentation_url.as_deref(),
            ArtifactKind::Document => self.document_url.as_deref()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub requester: String,
    pub parameters: TrainingParameters,
    pub status: JobStatus,
    pub artifacts: JobArtifacts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

impl Job {
    /// Jobs start in `processing`: persistence and processing begin together.
    pub fn new(requester: &str, parameters: TrainingParameters) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            requester: requester.to_string(),
            parameters,
            status: JobStatus::Processing,
            artifacts: JobArtifacts::default(),
            created_at: now,
            updated_at: now
        }
    }
}

/// Lifetime quota position of one requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub used: u32,
    pub max: u32,
    pub remaining: u32,
    pub has_exceeded_limit: bool
}

impl UsageSummary {
    pub fn new(used: u32, max: u32) -> Self {
        Self {
            used,
            max,
            remaining: max.saturating_sub(used),
            has_exceeded_limit: used >= max
        }
    }
}

/// Rate-limit metadata attached to every outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64
}

impl RateLimitInfo {
    pub fn reset_epoch_seconds(&self) -> i64 {
        (self.reset_at_ms + 999).div_euclid(1000)
    }
}

/// Payload handed to the notifier once a job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub job_id: Uuid,
    pub parameters: TrainingParameters,
    pub artifacts: JobArtifacts
}
