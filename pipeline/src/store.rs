//! In-process job and usage stores.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use errors::{GenerationError, GenerationResult};
use kit_core::{Job, JobArtifacts, JobStatus, JobStore, UsageStore};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, Job>
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: Job) -> GenerationResult<Job> {
        if job.status.is_terminal() {
            return Err(GenerationError::persistence(format!(
                "job {} cannot be created in status {}",
                job.id, job.status
            )));
        }
        if self.jobs.contains_key(&job.id) {
            return Err(GenerationError::persistence(format!("job {} already exists", job.id)));
        }

        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        artifacts: Option<JobArtifacts>
    ) -> GenerationResult<()> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| GenerationError::persistence(format!("job {id} not found")))?;

        if !job.status.can_transition_to(status) {
            return Err(GenerationError::persistence(format!(
                "job {id} cannot move from {} to {status}",
                job.status
            )));
        }

        job.status = status;
        if let Some(artifacts) = artifacts {
            job.artifacts = artifacts;
        }
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> GenerationResult<Option<Job>> {
        Ok(self.jobs.get(&id).map(|job| job.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryUsageStore {
    counts: DashMap<String, u32>
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn get_usage(&self, requester: &str) -> GenerationResult<u32> {
        Ok(self.counts.get(requester).map_or(0, |count| *count))
    }

    async fn increment(&self, requester: &str) -> GenerationResult<()> {
        self.counts
            .entry(requester.to_string())
            .and_modify(|count| *count = count.saturating_add(1))
            .or_insert(1);
        Ok(())
    }
}
