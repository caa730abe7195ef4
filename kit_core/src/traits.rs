//! Collaborator traits consumed by the generation pipeline

use async_trait::async_trait;
use errors::GenerationResult;
use uuid::Uuid;

use crate::types::{Job, JobArtifacts, JobStatus, Notification};

/// Job persistence. Writes are visible to subsequent reads from the same
/// process.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: Job) -> GenerationResult<Job>;

    /// Moves a job to `status`, replacing its artifacts when provided.
    /// Transitions not allowed by [`JobStatus::can_transition_to`] fail with
    /// a persistence error.
    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        artifacts: Option<JobArtifacts>
    ) -> GenerationResult<()>;

    async fn get(&self, id: Uuid) -> GenerationResult<Option<Job>>;
}

/// Lifetime generation counters keyed by requester. `increment` must be
/// atomic with respect to concurrent callers.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn get_usage(&self, requester: &str) -> GenerationResult<u32>;

    async fn increment(&self, requester: &str) -> GenerationResult<()>;
}

/// Fire-and-forget delivery of finished artifacts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, requester: &str, notification: &Notification) -> anyhow::Result<()>;
}
