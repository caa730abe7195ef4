//! # Training Kit Core
//!
//! Shared types and collaborator traits for the training kit generation
//! pipeline.
//!
//! This crate provides:
//! - Request, job and artifact types
//! - The topic and industry catalogue used for request validation
//! - Traits for the job store, usage store and notifier collaborators

pub mod catalog;
pub mod traits;
pub mod types;

pub use catalog::{TRAINING_INDUSTRIES, TRAINING_TOPICS, topic_label};
pub use traits::{JobStore, Notifier, UsageStore};
pub use types::{
    ArtifactKind, Job, JobArtifacts, JobStatus, Level, Notification, RateLimitInfo,
    TrainingParameters, TrainingRequest, UsageSummary
};
