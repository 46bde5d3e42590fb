//! Story API error types.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The service rejected the payload (HTTP 400/422).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The service no longer knows the job.
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Story service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => ApiError::Validation(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            502..=504 => ApiError::ServiceUnavailable(message),
            _ => ApiError::RequestFailed(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Transport-level failures.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::ServiceUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_retryable(&self) -> bool {
        self.is_network()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            ApiError::from_http_status(422, "bad prompt"),
            ApiError::Validation(_)
        ));
        assert!(ApiError::from_http_status(404, "gone").is_not_found());
        assert!(matches!(
            ApiError::from_http_status(409, "already finished"),
            ApiError::Conflict(_)
        ));
        assert!(ApiError::from_http_status(503, "down").is_network());
        assert!(matches!(
            ApiError::from_http_status(500, "boom"),
            ApiError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_validation_not_retryable() {
        assert!(!ApiError::Validation("empty".into()).is_retryable());
        assert!(ApiError::ServiceUnavailable("502".into()).is_retryable());
    }
}
