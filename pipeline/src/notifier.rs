//! Completion notifications.

use async_trait::async_trait;
use config::NotificationConfig;
use kit_core::{ArtifactKind, JobArtifacts, Notification, Notifier, topic_label};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Writes the notification to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, requester: &str, notification: &Notification) -> anyhow::Result<()> {
        info!(
            requester,
            job_id = %notification.job_id,
            presentation_url = notification.artifacts.presentation_url.as_deref().unwrap_or("-"),
            document_url = notification.artifacts.document_url.as_deref().unwrap_or("-"),
            "Training kit ready"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String
}

/// Delivers notifications through a Resend-compatible `POST /emails` API.
pub struct EmailNotifier {
    client: Client,
    base_url: String,
    api_key: String,
    from: String
}

impl EmailNotifier {
    pub fn new(base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string()
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, requester: &str, notification: &Notification) -> anyhow::Result<()> {
        let body = EmailRequest {
            from: &self.from,
            to: [requester],
            subject: email_subject(notification),
            html: render_email_html(notification)
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Email API error: {} - {}", status.as_u16(), text);
        }

        info!(job_id = %notification.job_id, "Notification email sent");
        Ok(())
    }
}

/// Email delivery when enabled with an API key, logging otherwise.
pub fn create_notifier(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match (&config.api_key, config.enabled) {
        (Some(api_key), true) if !api_key.is_empty() => {
            Arc::new(EmailNotifier::new(&config.base_url, api_key, &config.from))
        }
        (None, true) => {
            warn!("Notifications enabled without an API key, falling back to log delivery");
            Arc::new(LogNotifier)
        }
        _ => Arc::new(LogNotifier)
    }
}

pub fn email_subject(notification: &Notification) -> String {
    format!("Your {} Training Kit is Ready!", topic_label(&notification.parameters.topic))
}

pub fn render_email_html(notification: &Notification) -> String {
    let parameters = &notification.parameters;
    let topic = escape_html(topic_label(&parameters.topic));

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Your Training Kit is Ready!</h2>
  <p>Your custom <strong>{topic}</strong> training materials have been generated.</p>
  <div style="background-color: #f3f4f6; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="margin-top: 0;">Training Details:</h3>
    <ul>
      <li><strong>Topic:</strong> {topic}</li>
      <li><strong>Level:</strong> {level}</li>
      <li><strong>Duration:</strong> {duration} minutes</li>
      <li><strong>Industry:</strong> {industry}</li>
    </ul>
  </div>
  <h3>Your Training Materials:</h3>
  {presentation}
  {document}
</div>"#,
        level = parameters.level,
        duration = parameters.duration,
        industry = escape_html(&parameters.industry),
        presentation = artifact_link(&notification.artifacts, ArtifactKind::Presentation, "View Slide Deck"),
        document = artifact_link(&notification.artifacts, ArtifactKind::Document, "Open Instructor's Guide")
    )
}

fn artifact_link(artifacts: &JobArtifacts, kind: ArtifactKind, label: &str) -> String {
    match artifacts.url(kind) {
        Some(url) => format!(r#"<p><a href="{}">{label}</a></p>"#, escape_html(url)),
        None => {
            let id = match kind {
                ArtifactKind::Presentation => artifacts.presentation_external_id.as_deref(),
                ArtifactKind::Document => artifacts.document_external_id.as_deref()
            };
            format!(
                "<p>{label}: still processing (generation {})</p>",
                escape_html(id.unwrap_or("unknown"))
            )
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c)
        }
    }
    out
}
