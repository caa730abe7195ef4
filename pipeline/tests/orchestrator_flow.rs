use async_trait::async_trait;
use errors::{GenerationError, GenerationResult};
use kit_core::{
    ArtifactKind, Job, JobArtifacts, JobStatus, JobStore, Level, Notification, Notifier,
    TrainingRequest, UsageStore
};
use pipeline::{
    Collaborators, ContentGenerationAdapter, DocumentGenerator, GeneratedArtifact,
    InMemoryJobStore, InMemoryUsageStore, Limits, Orchestrator, RateLimiter, TemplateEngine,
    TextGenerationClient
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const SLIDES: &str = "# Why Kaizen\n---\n# PDCA\n---\n# Next Steps";
const GUIDE: &str = "## Facilitator notes";
const RATE_KEY: &str = "generate:trainer@example.com:203.0.113.7";

struct ScriptedText {
    replies: Mutex<VecDeque<GenerationResult<String>>>,
    calls: AtomicUsize
}

impl ScriptedText {
    fn new(replies: Vec<GenerationResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0)
        })
    }

    fn happy() -> Arc<Self> {
        Self::new(vec![Ok(SLIDES.to_string()), Ok(GUIDE.to_string())])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerationClient for ScriptedText {
    async fn generate_text(&self, _prompt: &str) -> GenerationResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SLIDES.to_string()))
    }
}

#[derive(Default)]
struct StubDocuments {
    failing: Vec<ArtifactKind>,
    pending: Vec<ArtifactKind>,
    calls: AtomicUsize
}

impl StubDocuments {
    fn failing(kinds: &[ArtifactKind]) -> Arc<Self> {
        Arc::new(Self {
            failing: kinds.to_vec(),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentGenerator for StubDocuments {
    async fn generate_artifact(&self, _content: &str, kind: ArtifactKind) -> GeneratedArtifact {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&kind) {
            return GeneratedArtifact::failed(
                kind,
                GenerationError::ExternalService {
                    service: "Gamma".to_string(),
                    status: Some(500),
                    body: format!("{kind} failed")
                }
            );
        }
        if self.pending.contains(&kind) {
            return GeneratedArtifact::provisional(
                kind,
                format!("{kind}-id"),
                Some(format!("https://gamma.app/docs/{kind}-id"))
            );
        }
        GeneratedArtifact::ready(
            kind,
            format!("https://docs.test/{kind}"),
            Some(format!("{kind}-id"))
        )
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, Notification)>>,
    fail: bool
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, requester: &str, notification: &Notification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((requester.to_string(), notification.clone()));
        if self.fail {
            anyhow::bail!("mail relay down");
        }
        Ok(())
    }
}

/// Job store whose completion write always fails.
struct FailingCompletionStore {
    inner: InMemoryJobStore
}

#[async_trait]
impl JobStore for FailingCompletionStore {
    async fn create(&self, job: Job) -> GenerationResult<Job> {
        self.inner.create(job).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        artifacts: Option<JobArtifacts>
    ) -> GenerationResult<()> {
        if status == JobStatus::Completed {
            return Err(GenerationError::persistence("connection reset"));
        }
        self.inner.update_status(id, status, artifacts).await
    }

    async fn get(&self, id: Uuid) -> GenerationResult<Option<Job>> {
        self.inner.get(id).await
    }
}

struct Harness {
    orchestrator: Orchestrator,
    text: Arc<ScriptedText>,
    documents: Arc<StubDocuments>,
    usage: Arc<InMemoryUsageStore>,
    notifier: Arc<RecordingNotifier>,
    limiter: Arc<RateLimiter>
}

struct HarnessBuilder {
    text: Arc<ScriptedText>,
    documents: Arc<StubDocuments>,
    jobs: Arc<dyn JobStore>,
    notifier: Arc<RecordingNotifier>,
    limiter: Arc<RateLimiter>,
    max_generations: u32
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            text: ScriptedText::happy(),
            documents: Arc::new(StubDocuments::default()),
            jobs: Arc::new(InMemoryJobStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            limiter: Arc::new(RateLimiter::new(5, 900_000)),
            max_generations: 3
        }
    }

    fn build(self) -> Harness {
        let templates = Arc::new(TemplateEngine::new());
        let usage = Arc::new(InMemoryUsageStore::new());
        let collaborators = Collaborators {
            content: ContentGenerationAdapter::new(
                self.text.clone(),
                templates.clone(),
                Duration::from_secs(5)
            ),
            documents: self.documents.clone(),
            jobs: self.jobs,
            usage: usage.clone(),
            notifier: self.notifier.clone()
        };
        let orchestrator = Orchestrator::new(
            self.limiter.clone(),
            templates,
            collaborators,
            Limits {
                max_generations: self.max_generations,
                max_content_length: 50_000
            }
        );

        Harness {
            orchestrator,
            text: self.text,
            documents: self.documents,
            usage,
            notifier: self.notifier,
            limiter: self.limiter
        }
    }
}

fn request() -> TrainingRequest {
    TrainingRequest {
        email: "trainer@example.com".to_string(),
        topic: "kaizen".to_string(),
        level: Level::Beginner,
        duration: 60,
        industry: "manufacturing".to_string()
    }
}

#[tokio::test]
async fn test_success_completes_job_and_counts_usage() {
    let h = HarnessBuilder::new().build();

    let outcome = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap();

    assert_eq!(
        outcome.artifacts.presentation_url.as_deref(),
        Some("https://docs.test/presentation")
    );
    assert_eq!(
        outcome.artifacts.document_url.as_deref(),
        Some("https://docs.test/document")
    );
    assert!(!outcome.provisional);
    assert_eq!(outcome.usage.used, 1);
    assert_eq!(outcome.usage.remaining, 2);
    assert_eq!(outcome.rate_limit.limit, 5);
    assert_eq!(outcome.rate_limit.remaining, 4);

    let job = h.orchestrator.job(outcome.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.artifacts, outcome.artifacts);

    assert_eq!(h.text.calls(), 2);
    assert_eq!(h.documents.calls(), 2);
    assert_eq!(h.usage.get_usage("trainer@example.com").await.unwrap(), 1);

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "trainer@example.com");
    assert_eq!(sent[0].1.job_id, outcome.job_id);
}

#[tokio::test]
async fn test_document_failure_fails_job_without_usage() {
    let mut builder = HarnessBuilder::new();
    builder.documents = StubDocuments::failing(&[ArtifactKind::Document]);
    let h = builder.build();

    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();

    let job_id = failure.job_id.expect("job should exist");
    let job = h.orchestrator.job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.artifacts, JobArtifacts::default());
    assert_eq!(h.documents.calls(), 2);
    assert_eq!(h.usage.get_usage("trainer@example.com").await.unwrap(), 0);
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_presentation_failure_reported_first() {
    let mut builder = HarnessBuilder::new();
    builder.documents =
        StubDocuments::failing(&[ArtifactKind::Presentation, ArtifactKind::Document]);
    let h = builder.build();

    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();
    assert_eq!(
        failure.error,
        GenerationError::ExternalService {
            service: "Gamma".to_string(),
            status: Some(500),
            body: "presentation failed".to_string()
        }
    );
}

#[tokio::test]
async fn test_provisional_artifacts_still_complete() {
    let mut builder = HarnessBuilder::new();
    builder.documents = Arc::new(StubDocuments {
        pending: vec![ArtifactKind::Presentation],
        ..StubDocuments::default()
    });
    let h = builder.build();

    let outcome = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap();
    assert!(outcome.provisional);
    assert_eq!(
        outcome.artifacts.presentation_external_id.as_deref(),
        Some("presentation-id")
    );
    assert_eq!(outcome.usage.used, 1);
}

#[tokio::test]
async fn test_invalid_request_creates_nothing_and_keeps_budget() {
    let jobs = Arc::new(InMemoryJobStore::new());
    let mut builder = HarnessBuilder::new();
    builder.jobs = jobs.clone();
    let h = builder.build();

    let mut bad = request();
    bad.duration = 45;
    let failure = h.orchestrator.generate(&bad, RATE_KEY).await.unwrap_err();

    assert_eq!(failure.error.code(), "VALIDATION_ERROR");
    assert_eq!(failure.job_id, None);
    assert_eq!(failure.rate_limit.remaining, 5);
    assert_eq!(jobs.len(), 0);
    assert!(h.limiter.is_empty());
    assert_eq!(h.text.calls(), 0);
}

#[tokio::test]
async fn test_rate_limited_request_has_no_job() {
    let mut builder = HarnessBuilder::new();
    builder.limiter = Arc::new(RateLimiter::new(1, 900_000));
    let h = builder.build();

    h.orchestrator.generate(&request(), RATE_KEY).await.unwrap();
    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();

    assert!(matches!(failure.error, GenerationError::RateLimited { .. }));
    assert_eq!(failure.job_id, None);
    assert_eq!(failure.rate_limit.remaining, 0);
    assert_eq!(h.text.calls(), 2);
}

#[tokio::test]
async fn test_quota_exhausted_before_job() {
    let h = HarnessBuilder::new().build();
    for _ in 0..3 {
        h.usage.increment("trainer@example.com").await.unwrap();
    }

    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();

    assert_eq!(failure.error, GenerationError::QuotaExceeded { used: 3, max: 3 });
    assert_eq!(failure.job_id, None);
    assert_eq!(h.text.calls(), 0);
    assert_eq!(failure.rate_limit.remaining, 4);
}

#[tokio::test]
async fn test_first_stage_failure_stops_pipeline() {
    let mut builder = HarnessBuilder::new();
    let upstream = GenerationError::ExternalService {
        service: "Gemini".to_string(),
        status: Some(503),
        body: "overloaded".to_string()
    };
    builder.text = ScriptedText::new(vec![Err(upstream.clone())]);
    let h = builder.build();

    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();

    assert_eq!(failure.error, upstream);
    assert_eq!(h.text.calls(), 1);
    assert_eq!(h.documents.calls(), 0);
    let job = h
        .orchestrator
        .job(failure.job_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_invalid_generated_slides_fail_job() {
    let mut builder = HarnessBuilder::new();
    builder.text = ScriptedText::new(vec![Ok("---\n  \n---".to_string()), Ok(GUIDE.to_string())]);
    let h = builder.build();

    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();

    assert_eq!(failure.error.code(), "VALIDATION_ERROR");
    assert!(failure.job_id.is_some());
    assert_eq!(h.documents.calls(), 0);
    assert_eq!(h.usage.get_usage("trainer@example.com").await.unwrap(), 0);
}

#[tokio::test]
async fn test_completion_write_failure_marks_job_failed() {
    let store = Arc::new(FailingCompletionStore {
        inner: InMemoryJobStore::new()
    });
    let mut builder = HarnessBuilder::new();
    builder.jobs = store.clone();
    let h = builder.build();

    let failure = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap_err();

    assert!(matches!(failure.error, GenerationError::Persistence { .. }));
    let job = store.get(failure.job_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(h.usage.get_usage("trainer@example.com").await.unwrap(), 0);
}

#[tokio::test]
async fn test_notifier_failure_is_not_surfaced() {
    let mut builder = HarnessBuilder::new();
    builder.notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    });
    let h = builder.build();

    let outcome = h.orchestrator.generate(&request(), RATE_KEY).await.unwrap();
    assert_eq!(outcome.usage.used, 1);
    assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_usage_summary() {
    let h = HarnessBuilder::new().build();
    h.orchestrator.generate(&request(), RATE_KEY).await.unwrap();

    let summary = h.orchestrator.usage("trainer@example.com").await.unwrap();
    assert_eq!(summary.used, 1);
    assert_eq!(summary.max, 3);
    assert_eq!(summary.remaining, 2);
    assert!(!summary.has_exceeded_limit);

    let fresh = h.orchestrator.usage("new@example.com").await.unwrap();
    assert_eq!(fresh.used, 0);
}
