//! # Training Kit Generation Pipeline
//!
//! Turns a validated training request into a slide deck and an instructor
//! guide.
//!
//! - [`rate_limit`]: fixed-window admission control per requester key
//! - [`template`]: prompt construction with slide distribution and
//!   conditional content blocks
//! - [`content`]: two-stage text generation against a `generateContent` API
//! - [`document`]: artifact creation with quick polling and fallback
//! - [`orchestrator`]: the job state machine tying the stages together
//! - [`store`], [`notifier`]: in-process collaborator implementations

pub mod cleanup;
pub mod content;
pub mod document;
pub mod notifier;
pub mod orchestrator;
pub mod rate_limit;
pub mod store;
pub mod telemetry;
pub mod template;

pub use cleanup::RateLimitSweeper;
pub use content::{ContentGenerationAdapter, GeminiClient, GeneratedContent, TextGenerationClient};
pub use document::{
    DocumentGenerator, FallbackStrategy, GammaAdapter, GeneratedArtifact, IdentifierOnlyFallback,
    UrlTemplateFallback, format_content, validate_content,
};
pub use notifier::{EmailNotifier, LogNotifier, create_notifier};
pub use orchestrator::{Collaborators, GenerationFailure, GenerationOutcome, Limits, Orchestrator};
pub use rate_limit::{Admission, RateLimiter};
pub use store::{InMemoryJobStore, InMemoryUsageStore};
pub use template::{PromptContext, SlideDistribution, SlideRules, TemplateEngine};
