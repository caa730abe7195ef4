//! Document artifact generation.
//!
//! One creation call per artifact. When the service answers with a pending
//! generation id instead of a URL, the adapter polls a few times and then
//! falls back to a provisional artifact built by a [`FallbackStrategy`].

use async_trait::async_trait;
use config::DocumentServiceConfig;
use errors::{GenerationError, GenerationResult};
use kit_core::ArtifactKind;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::content::transport_error;
use crate::telemetry::{ExternalCallTimer, Telemetry};

pub const GAMMA_SERVICE: &str = "Gamma";

const URL_FIELDS: &[&str] = &["url", "shareUrl", "link"];
const ID_FIELDS: &[&str] = &["id", "generationId"];

/// Outcome of one document-generation call. Never an `Err`: failures are
/// carried in `error` so both concurrent calls can always be inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub url: Option<String>,
    pub external_id: Option<String>,
    pub succeeded: bool,
    pub error: Option<GenerationError>,
    pub provisional: bool
}

impl GeneratedArtifact {
    pub fn ready(kind: ArtifactKind, url: String, external_id: Option<String>) -> Self {
        Self {
            kind,
            url: Some(url),
            external_id,
            succeeded: true,
            error: None,
            provisional: false
        }
    }

    pub fn provisional(kind: ArtifactKind, external_id: String, url: Option<String>) -> Self {
        Self {
            kind,
            url,
            external_id: Some(external_id),
            succeeded: true,
            error: None,
            provisional: true
        }
    }

    pub fn failed(kind: ArtifactKind, error: GenerationError) -> Self {
        Self {
            kind,
            url: None,
            external_id: None,
            succeeded: false,
            error: Some(error),
            provisional: false
        }
    }

    /// `validation`, `timeout`, `service` or `parse` for failed artifacts.
    pub fn failure_class(&self) -> Option<&'static str> {
        self.error.as_ref().map(|error| match error {
            GenerationError::Validation { .. } => "validation",
            GenerationError::ExternalTimeout { .. } => "timeout",
            GenerationError::Parse { .. } => "parse",
            _ => "service"
        })
    }

    pub fn into_result(self) -> GenerationResult<Self> {
        if self.succeeded {
            return Ok(self);
        }
        let kind = self.kind;
        Err(self.error.unwrap_or_else(|| GenerationError::ExternalService {
            service: GAMMA_SERVICE.to_string(),
            status: None,
            body: format!("{kind} generation failed")
        }))
    }
}

/// Builds the artifact URL for a generation that was still pending when
/// polling gave up.
pub trait FallbackStrategy: Send + Sync {
    fn resolve(&self, external_id: &str) -> Option<String>;
}

/// Substitutes the generation id into a URL pattern such as
/// `https://gamma.app/docs/{id}`.
#[derive(Debug, Clone)]
pub struct UrlTemplateFallback {
    template: String
}

impl UrlTemplateFallback {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into()
        }
    }
}

impl FallbackStrategy for UrlTemplateFallback {
    fn resolve(&self, external_id: &str) -> Option<String> {
        Some(self.template.replace("{id}", external_id))
    }
}

/// Records only the generation id; the URL is left for later retrieval.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierOnlyFallback;

impl FallbackStrategy for IdentifierOnlyFallback {
    fn resolve(&self, _external_id: &str) -> Option<String> {
        None
    }
}

pub fn fallback_from_config(config: &DocumentServiceConfig) -> Arc<dyn FallbackStrategy> {
    match &config.fallback_url_template {
        Some(template) => Arc::new(UrlTemplateFallback::new(template.clone())),
        None => Arc::new(IdentifierOnlyFallback)
    }
}

/// Rejects content the document service would not accept.
pub fn validate_content(content: &str, kind: ArtifactKind, max_length: usize) -> GenerationResult<()> {
    if content.trim().is_empty() {
        return Err(GenerationError::validation(format!("Generated {kind} content is empty")));
    }

    if content.chars().count() > max_length {
        return Err(GenerationError::validation(format!(
            "Generated {kind} content exceeds maximum length of {max_length} characters"
        )));
    }

    if kind == ArtifactKind::Presentation
        && !collapse_slide_breaks(content)
            .split("---")
            .any(|slide| !slide.trim().is_empty())
    {
        return Err(GenerationError::validation("Generated presentation contains no slides"));
    }

    Ok(())
}

/// Presentations get runs of three or more dashes collapsed to a single
/// `---` slide break. Both kinds are trimmed.
pub fn format_content(content: &str, kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Presentation => collapse_slide_breaks(content).trim().to_string(),
        ArtifactKind::Document => content.trim().to_string()
    }
}

fn collapse_slide_breaks(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut dashes = 0usize;

    for c in content.chars() {
        if c == '-' {
            dashes += 1;
            continue;
        }
        flush_dashes(&mut out, dashes);
        dashes = 0;
        out.push(c);
    }
    flush_dashes(&mut out, dashes);
    out
}

fn flush_dashes(out: &mut String, count: usize) {
    if count >= 3 {
        out.push_str("---");
    } else {
        out.extend(std::iter::repeat_n('-', count));
    }
}

/// `{base}/{id}` with the id escaped as a single path segment.
fn status_url(base_url: &str, generation_id: &str) -> GenerationResult<Url> {
    let mut url = Url::parse(base_url).map_err(|e| GenerationError::Configuration {
        message: format!("Invalid document service URL: {e}")
    })?;
    url.path_segments_mut()
        .map_err(|()| GenerationError::Configuration {
            message: format!("Document service URL cannot take a path: {base_url}")
        })?
        .pop_if_empty()
        .push(generation_id);
    Ok(url)
}

fn first_string(payload: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match payload.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None
    })
}

fn ready_url(payload: &Value) -> Option<String> {
    URL_FIELDS.iter().find_map(|field| {
        payload
            .get(*field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn generation_id(payload: &Value) -> Option<String> {
    first_string(payload, ID_FIELDS)
}

#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate_artifact(&self, content: &str, kind: ArtifactKind) -> GeneratedArtifact;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGenerationRequest<'a> {
    input_text: &'a str,
    format: ArtifactKind,
    text_options: TextOptions<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<&'a str>
}

#[derive(Serialize)]
struct TextOptions<'a> {
    language: &'a str
}

/// Client for the Gamma generations API.
pub struct GammaAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    poll_attempts: u32,
    poll_interval: Duration,
    max_content_length: usize,
    language: String,
    theme: Option<String>,
    fallback: Arc<dyn FallbackStrategy>
}

impl GammaAdapter {
    pub fn new(config: &DocumentServiceConfig) -> GenerationResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GenerationError::Configuration {
                message: "GAMMA_API_KEY is not configured".to_string()
            })?;

        Ok(Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: config.timeout(),
            poll_attempts: config.poll_attempts,
            poll_interval: config.poll_interval(),
            max_content_length: config.max_content_length,
            language: config.language.clone(),
            theme: config.theme.clone(),
            fallback: fallback_from_config(config)
        })
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    async fn create(&self, content: &str, kind: ArtifactKind) -> GenerationResult<Value> {
        let body = CreateGenerationRequest {
            input_text: content,
            format: kind,
            text_options: TextOptions {
                language: &self.language
            },
            theme: self.theme.as_deref()
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(GAMMA_SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ExternalService {
                service: GAMMA_SERVICE.to_string(),
                status: Some(status.as_u16()),
                body
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GenerationError::parse(GAMMA_SERVICE, e.to_string()))
    }

    async fn fetch_status(&self, generation_id: &str) -> GenerationResult<Option<String>> {
        let url = status_url(&self.base_url, generation_id)?;

        let response = self
            .client
            .get(url)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| transport_error(GAMMA_SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ExternalService {
                service: GAMMA_SERVICE.to_string(),
                status: Some(status.as_u16()),
                body
            });
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| GenerationError::parse(GAMMA_SERVICE, e.to_string()))?;
        Ok(ready_url(&payload))
    }

    async fn poll(&self, kind: ArtifactKind, generation_id: String) -> GeneratedArtifact {
        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;
            Telemetry::record_poll_attempt();

            match tokio::time::timeout(self.timeout, self.fetch_status(&generation_id)).await {
                Ok(Ok(Some(url))) => {
                    info!(%kind, generation_id = %generation_id, attempt, "Generation completed while polling");
                    return GeneratedArtifact::ready(kind, url, Some(generation_id));
                }
                Ok(Ok(None)) => {
                    debug!(%kind, attempt, attempts = self.poll_attempts, "Generation still processing");
                }
                Ok(Err(e)) => {
                    warn!(%kind, attempt, error = %e, "Polling attempt failed");
                }
                Err(_) => {
                    warn!(%kind, attempt, "Polling attempt timed out");
                }
            }
        }

        Telemetry::record_fallback_artifact();
        let url = self.fallback.resolve(&generation_id);
        info!(
            %kind,
            generation_id = %generation_id,
            has_url = url.is_some(),
            "Generation still pending after polling, returning provisional artifact"
        );
        GeneratedArtifact::provisional(kind, generation_id, url)
    }
}

#[async_trait]
impl DocumentGenerator for GammaAdapter {
    async fn generate_artifact(&self, content: &str, kind: ArtifactKind) -> GeneratedArtifact {
        if let Err(e) = validate_content(content, kind, self.max_content_length) {
            return GeneratedArtifact::failed(kind, e);
        }

        let formatted = format_content(content, kind);
        debug!(%kind, chars = formatted.len(), "Requesting document generation");

        let timer = ExternalCallTimer::new(GAMMA_SERVICE);
        let payload = match tokio::time::timeout(self.timeout, self.create(&formatted, kind)).await {
            Ok(Ok(payload)) => {
                timer.finish("success");
                payload
            }
            Ok(Err(e)) => {
                timer.finish("error");
                warn!(%kind, error = %e, "Document generation request failed");
                return GeneratedArtifact::failed(kind, e);
            }
            Err(_) => {
                timer.finish("timeout");
                warn!(%kind, timeout_ms = self.timeout.as_millis() as u64, "Document generation timed out");
                return GeneratedArtifact::failed(
                    kind,
                    GenerationError::ExternalTimeout {
                        service: GAMMA_SERVICE.to_string(),
                        timeout_ms: self.timeout.as_millis() as u64
                    }
                );
            }
        };

        if let Some(url) = ready_url(&payload) {
            return GeneratedArtifact::ready(kind, url, generation_id(&payload));
        }

        match generation_id(&payload) {
            Some(id) => {
                info!(%kind, generation_id = %id, "Generation started, polling for completion");
                self.poll(kind, id).await
            }
            None => GeneratedArtifact::failed(
                kind,
                GenerationError::parse(GAMMA_SERVICE, "Unexpected response format")
            )
        }
    }
}
