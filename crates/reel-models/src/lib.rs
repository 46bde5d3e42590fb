//! Shared data models for StoryReel generation.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests (prompt, visual style, duration, aspect ratio)
//! - Remote job snapshots and scene statuses
//! - Orchestrator-side job status and pipeline phase
//! - Video library records

pub mod job;
pub mod request;
pub mod snapshot;
pub mod style;
pub mod video;

// Re-export common types
pub use job::{GenerationStatus, JobId, Phase};
pub use request::{GenerationRequest, RequestValidationError};
pub use snapshot::{JobSnapshot, RemoteJobStatus, SceneStatus};
pub use style::{AspectRatio, StoryDuration, VisualStyle};
pub use video::{NewVideoRecord, RecordId, RecordPatch, VideoRecord, VideoStatus};
