//! Generation job state machine.
//!
//! Order of operations for one request:
//!
//! 1. request validation, admission and quota check (no job yet)
//! 2. job creation in `processing`
//! 3. two-stage content generation, then validation of both texts
//! 4. both documents generated concurrently, joined all-or-nothing
//! 5. job completed, usage incremented, requester notified
//!
//! Any failure after step 2 marks the job `failed` before it is returned.
//! Usage and notification failures after completion are only logged.

use config::Config;
use errors::{GenerationError, GenerationResult};
use kit_core::{
    ArtifactKind, Job, JobArtifacts, JobStatus, JobStore, Notification, Notifier, RateLimitInfo,
    TrainingRequest, UsageStore, UsageSummary
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::content::ContentGenerationAdapter;
use crate::document::{DocumentGenerator, GammaAdapter, validate_content};
use crate::notifier::create_notifier;
use crate::rate_limit::RateLimiter;
use crate::store::{InMemoryJobStore, InMemoryUsageStore};
use crate::telemetry::Telemetry;
use crate::template::TemplateEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub job_id: Uuid,
    pub artifacts: JobArtifacts,
    pub usage: UsageSummary,
    pub rate_limit: RateLimitInfo,
    /// At least one artifact came from the poll-exhaustion fallback.
    pub provisional: bool
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct GenerationFailure {
    pub error: GenerationError,
    /// Set once a job record exists; that job is `failed`.
    pub job_id: Option<Uuid>,
    pub rate_limit: RateLimitInfo
}

impl GenerationFailure {
    fn before_job(error: GenerationError, rate_limit: RateLimitInfo) -> Self {
        Self {
            error,
            job_id: None,
            rate_limit
        }
    }

    fn for_job(error: GenerationError, job_id: Uuid, rate_limit: RateLimitInfo) -> Self {
        Self {
            error,
            job_id: Some(job_id),
            rate_limit
        }
    }
}

/// External collaborators driven by the orchestrator.
pub struct Collaborators {
    pub content: ContentGenerationAdapter,
    pub documents: Arc<dyn DocumentGenerator>,
    pub jobs: Arc<dyn JobStore>,
    pub usage: Arc<dyn UsageStore>,
    pub notifier: Arc<dyn Notifier>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_generations: u32,
    pub max_content_length: usize
}

impl Limits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_generations: config.quota.max_free_generations,
            max_content_length: config.documents.max_content_length
        }
    }
}

pub struct Orchestrator {
    rate_limiter: Arc<RateLimiter>,
    templates: Arc<TemplateEngine>,
    content: ContentGenerationAdapter,
    documents: Arc<dyn DocumentGenerator>,
    jobs: Arc<dyn JobStore>,
    usage: Arc<dyn UsageStore>,
    notifier: Arc<dyn Notifier>,
    limits: Limits
}

impl Orchestrator {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        templates: Arc<TemplateEngine>,
        collaborators: Collaborators,
        limits: Limits
    ) -> Self {
        Self {
            rate_limiter,
            templates,
            content: collaborators.content,
            documents: collaborators.documents,
            jobs: collaborators.jobs,
            usage: collaborators.usage,
            notifier: collaborators.notifier,
            limits
        }
    }

    /// Wires the HTTP-backed adapters with in-process stores.
    pub fn from_config(config: &Config, rate_limiter: Arc<RateLimiter>) -> GenerationResult<Self> {
        let templates = Arc::new(TemplateEngine::new());
        let collaborators = Collaborators {
            content: ContentGenerationAdapter::from_config(&config.content, templates.clone())?,
            documents: Arc::new(GammaAdapter::new(&config.documents)?),
            jobs: Arc::new(InMemoryJobStore::new()),
            usage: Arc::new(InMemoryUsageStore::new()),
            notifier: create_notifier(&config.notifications)
        };

        Ok(Self::new(
            rate_limiter,
            templates,
            collaborators,
            Limits::from_config(config)
        ))
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub async fn job(&self, id: Uuid) -> GenerationResult<Option<Job>> {
        self.jobs.get(id).await
    }

    pub async fn usage(&self, requester: &str) -> GenerationResult<UsageSummary> {
        let used = self.usage.get_usage(requester).await?;
        Ok(UsageSummary::new(used, self.limits.max_generations))
    }

    /// Runs one request end to end. `rate_limit_key` scopes admission; the
    /// requester identity for jobs and quota is the request email.
    pub async fn generate(
        &self,
        request: &TrainingRequest,
        rate_limit_key: &str
    ) -> Result<GenerationOutcome, GenerationFailure> {
        if let Err(error) = request.check() {
            let snapshot = self.rate_limiter.snapshot(rate_limit_key);
            return Err(GenerationFailure::before_job(error, snapshot));
        }

        let admission = self.rate_limiter.admit(rate_limit_key);
        let rate_limit = admission.info;
        if !admission.allowed {
            Telemetry::record_rate_limited();
            warn!(key = rate_limit_key, reset_at_ms = rate_limit.reset_at_ms, "Rate limit exceeded");
            return Err(GenerationFailure::before_job(
                GenerationError::RateLimited {
                    reset_at_ms: rate_limit.reset_at_ms
                },
                rate_limit
            ));
        }

        let requester = request.email.as_str();
        let max = self.limits.max_generations;
        let used = self
            .usage
            .get_usage(requester)
            .await
            .map_err(|e| GenerationFailure::before_job(e, rate_limit))?;
        if used >= max {
            info!(requester, used, max, "Generation quota exhausted");
            return Err(GenerationFailure::before_job(
                GenerationError::QuotaExceeded { used, max },
                rate_limit
            ));
        }

        let job = self
            .jobs
            .create(Job::new(requester, request.parameters()))
            .await
            .map_err(|e| GenerationFailure::before_job(e, rate_limit))?;
        info!(job_id = %job.id, requester, topic = %job.parameters.topic, "Generation job started");

        let (artifacts, provisional) = match self.run(&job).await {
            Ok(result) => result,
            Err(error) => {
                self.mark_failed(job.id, &error).await;
                return Err(GenerationFailure::for_job(error, job.id, rate_limit));
            }
        };

        if let Err(error) = self
            .jobs
            .update_status(job.id, JobStatus::Completed, Some(artifacts.clone()))
            .await
        {
            self.mark_failed(job.id, &error).await;
            return Err(GenerationFailure::for_job(error, job.id, rate_limit));
        }
        Telemetry::record_job("completed");
        info!(job_id = %job.id, provisional, "Generation job completed");

        let used_now = match self.usage.increment(requester).await {
            Ok(()) => self.usage.get_usage(requester).await.unwrap_or(used + 1),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Failed to increment usage counter");
                used
            }
        };

        let notification = Notification {
            job_id: job.id,
            parameters: job.parameters.clone(),
            artifacts: artifacts.clone()
        };
        if let Err(e) = self.notifier.send(requester, &notification).await {
            warn!(job_id = %job.id, error = %e, "Failed to send completion notification");
        }

        Ok(GenerationOutcome {
            job_id: job.id,
            artifacts,
            usage: UsageSummary::new(used_now, max),
            rate_limit,
            provisional
        })
    }

    async fn run(&self, job: &Job) -> GenerationResult<(JobArtifacts, bool)> {
        let context = self.templates.context(&job.parameters);
        let content = self.content.generate_content(&context).await?;

        validate_content(
            &content.presentation,
            ArtifactKind::Presentation,
            self.limits.max_content_length
        )?;
        validate_content(
            &content.instructor_guide,
            ArtifactKind::Document,
            self.limits.max_content_length
        )?;

        let (presentation, document) = tokio::join!(
            self.documents
                .generate_artifact(&content.presentation, ArtifactKind::Presentation),
            self.documents
                .generate_artifact(&content.instructor_guide, ArtifactKind::Document)
        );

        let presentation = presentation.into_result()?;
        let document = document.into_result()?;
        let provisional = presentation.provisional || document.provisional;

        Ok((
            JobArtifacts {
                presentation_url: presentation.url,
                document_url: document.url,
                presentation_external_id: presentation.external_id,
                document_external_id: document.external_id
            },
            provisional
        ))
    }

    async fn mark_failed(&self, job_id: Uuid, cause: &GenerationError) {
        Telemetry::record_job("failed");
        error!(job_id = %job_id, code = cause.code(), error = %cause, "Generation job failed");

        if let Err(e) = self
            .jobs
            .update_status(job_id, JobStatus::Failed, None)
            .await
        {
            error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
        }
    }
}
