use metrics::{counter, histogram};
use std::time::Instant;

pub struct Telemetry;

impl Telemetry {
    pub fn record_job(status: &str) {
        counter!("trainkit_jobs_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_rate_limited() {
        counter!("trainkit_rate_limited_total").increment(1);
    }

    pub fn record_external_call(service: &str, outcome: &str) {
        counter!(
            "trainkit_external_calls_total",
            "service" => service.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    pub fn record_external_latency(service: &str, duration_ms: f64) {
        histogram!("trainkit_external_call_duration_ms", "service" => service.to_string())
            .record(duration_ms);
    }

    pub fn record_poll_attempt() {
        counter!("trainkit_poll_attempts_total").increment(1);
    }

    pub fn record_fallback_artifact() {
        counter!("trainkit_fallback_artifacts_total").increment(1);
    }
}

/// Times one external call and records its latency and outcome on finish.
pub struct ExternalCallTimer {
    start: Instant,
    service: &'static str
}

impl ExternalCallTimer {
    pub fn new(service: &'static str) -> Self {
        Self {
            start: Instant::now(),
            service
        }
    }

    pub fn finish(self, outcome: &str) {
        let duration = self.start.elapsed().as_millis() as f64;
        Telemetry::record_external_latency(self.service, duration);
        Telemetry::record_external_call(self.service, outcome);
    }
}
