//! Story generation orchestration.
//!
//! This crate provides:
//! - `GenerationOrchestrator`, which runs one job at a time against the story
//!   service and mirrors it into the video library
//! - `GenerationState` and its reducer, published through a watch channel
//! - Snapshot to progress translation

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod state;

pub use config::{OrchestratorConfig, ProgressConfig};
pub use error::{GenerationError, GenerationResult};
pub use logging::JobLogger;
pub use orchestrator::{CompletedJob, GenerationOrchestrator};
pub use progress::{translate, ProgressUpdate};
pub use state::{GenerationEvent, GenerationForm, GenerationState};
