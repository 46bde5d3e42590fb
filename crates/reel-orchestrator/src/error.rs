//! Orchestrator error types.

use reel_api_client::{ApiError, PollError};
use reel_models::RequestValidationError;
use thiserror::Error;

pub type GenerationResult<T> = Result<T, GenerationError>;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Rejected locally; no remote call was made.
    #[error(transparent)]
    Validation(#[from] RequestValidationError),

    #[error("A generation is already in progress")]
    AlreadyRunning,

    #[error("Story service error: {0}")]
    Api(#[from] ApiError),

    /// The service reported the job as failed.
    #[error("{0}")]
    JobFailed(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors that leave state untouched because no job was ever claimed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GenerationError::Validation(_) | GenerationError::AlreadyRunning
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }

    /// Message shown to the user when this error ends a job.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Api(ApiError::Network(_))
            | GenerationError::Api(ApiError::ServiceUnavailable(_)) => {
                "Could not reach the story service".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<PollError> for GenerationError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Api(e) => GenerationError::Api(e),
            PollError::JobFailed(msg) => GenerationError::JobFailed(msg),
            PollError::Cancelled | PollError::RemoteCancelled => GenerationError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections() {
        assert!(GenerationError::AlreadyRunning.is_rejection());
        assert!(GenerationError::from(RequestValidationError::EmptyPrompt).is_rejection());
        assert!(!GenerationError::JobFailed("x".into()).is_rejection());
    }

    #[test]
    fn test_poll_errors_map() {
        assert!(GenerationError::from(PollError::RemoteCancelled).is_cancelled());
        let err = GenerationError::from(PollError::JobFailed("render crashed".into()));
        assert_eq!(err.user_message(), "render crashed");
    }

    #[test]
    fn test_unreachable_service_message() {
        let err = GenerationError::from(ApiError::ServiceUnavailable("502".into()));
        assert_eq!(err.user_message(), "Could not reach the story service");

        let err = GenerationError::from(ApiError::Validation("prompt too long".into()));
        assert_eq!(err.user_message(), "Story service error: Validation error: prompt too long");
    }
}
