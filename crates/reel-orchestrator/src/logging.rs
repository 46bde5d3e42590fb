//! Structured logging for generation runs.

use tracing::{error, info, warn, Span};
use reel_models::JobId;

/// Logs generation lifecycle events with the job id and operation attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self::from_string(job_id.as_str(), operation)
    }

    /// Logger for a run whose job id is not known yet.
    pub fn from_string(job_id: &str, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Generation started: {}", message
        );
    }

    pub fn log_progress(&self, progress: u8, phase: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            progress,
            phase,
            "Generation progress"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Generation warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Generation error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Generation completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the job id, for instrumenting a whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "generation",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
