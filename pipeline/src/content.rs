//! Two-stage text generation.
//!
//! Stage 1 writes the slide deck from the presentation prompt. Stage 2 writes
//! the instructor guide from a prompt that embeds the stage 1 output. Each
//! stage runs under its own deadline and stage 2 never starts when stage 1
//! fails.

use async_trait::async_trait;
use config::ContentServiceConfig;
use errors::{GenerationError, GenerationResult};
use reqwest::{Client, Url};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::telemetry::ExternalCallTimer;
use crate::template::{PromptContext, TemplateEngine};

pub const GEMINI_SERVICE: &str = "Gemini";

#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    fn service(&self) -> &'static str {
        GEMINI_SERVICE
    }

    async fn generate_text(&self, prompt: &str) -> GenerationResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub presentation: String,
    pub instructor_guide: String
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [ContentBlock<'a>; 1]
}

#[derive(Serialize)]
struct ContentBlock<'a> {
    parts: [TextPart<'a>; 1]
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str
}

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the `models/{model}:generateContent` endpoint. The key travels
/// in a header so it never appears in request URLs.
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: String
}

impl GeminiClient {
    pub fn new(config: &ContentServiceConfig) -> GenerationResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GenerationError::Configuration {
                message: "GEMINI_API_KEY is not configured".to_string()
            })?;

        let endpoint = Url::parse(&format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        ))
        .map_err(|e| GenerationError::Configuration {
            message: format!("Invalid content service URL: {e}")
        })?;

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: api_key.to_string()
        })
    }
}

#[async_trait]
impl TextGenerationClient for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> GenerationResult<String> {
        let body = GenerateContentRequest {
            contents: [ContentBlock {
                parts: [TextPart { text: prompt }]
            }]
        };

        debug!(prompt_chars = prompt.len(), "Calling text generation API");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(GEMINI_SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ExternalService {
                service: GEMINI_SERVICE.to_string(),
                status: Some(status.as_u16()),
                body
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::parse(GEMINI_SERVICE, e.to_string()))?;

        extract_text(&payload)
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body.
pub fn extract_text(payload: &serde_json::Value) -> GenerationResult<String> {
    payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            GenerationError::parse(GEMINI_SERVICE, "missing candidates[0].content.parts[0].text")
        })
}

/// The request URL is stripped from the message before it can reach logs or
/// responses.
pub(crate) fn transport_error(service: &str, error: reqwest::Error) -> GenerationError {
    let error = error.without_url();
    GenerationError::ExternalService {
        service: service.to_string(),
        status: error.status().map(|s| s.as_u16()),
        body: error.to_string()
    }
}

pub struct ContentGenerationAdapter {
    client: Arc<dyn TextGenerationClient>,
    templates: Arc<TemplateEngine>,
    timeout: Duration
}

impl ContentGenerationAdapter {
    pub fn new(
        client: Arc<dyn TextGenerationClient>,
        templates: Arc<TemplateEngine>,
        timeout: Duration
    ) -> Self {
        Self {
            client,
            templates,
            timeout
        }
    }

    pub fn from_config(
        config: &ContentServiceConfig,
        templates: Arc<TemplateEngine>
    ) -> GenerationResult<Self> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(Arc::new(client), templates, config.timeout()))
    }

    pub async fn generate_content(&self, context: &PromptContext) -> GenerationResult<GeneratedContent> {
        let presentation_prompt = self.templates.render_presentation(context);
        let presentation = self.run_stage("presentation", &presentation_prompt).await?;

        let guide_prompt = self.templates.build_guide(context, &presentation);
        let instructor_guide = self.run_stage("instructor_guide", &guide_prompt).await?;

        Ok(GeneratedContent {
            presentation,
            instructor_guide
        })
    }

    async fn run_stage(&self, stage: &str, prompt: &str) -> GenerationResult<String> {
        let service = self.client.service();
        let timer = ExternalCallTimer::new(service);

        match tokio::time::timeout(self.timeout, self.client.generate_text(prompt)).await {
            Ok(Ok(text)) => {
                timer.finish("success");
                info!(stage, chars = text.len(), "Content stage completed");
                Ok(text)
            }
            Ok(Err(e)) => {
                timer.finish("error");
                warn!(stage, error = %e, "Content stage failed");
                Err(e)
            }
            Err(_) => {
                timer.finish("timeout");
                warn!(stage, timeout_ms = self.timeout.as_millis() as u64, "Content stage timed out");
                Err(GenerationError::ExternalTimeout {
                    service: service.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64
                })
            }
        }
    }
}
