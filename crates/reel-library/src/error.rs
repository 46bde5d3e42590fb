//! Library error types.

use thiserror::Error;

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors that can occur while reading or writing library records.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LibraryError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            401 => Self::AuthError(msg),
            403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            409 => Self::AlreadyExists(msg),
            // Firestore does not send Retry-After; back off for a second.
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::RateLimited(_) => Some(429),
            Self::ServerError(status, _) => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Delay requested by the server before retrying.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LibraryError::Network(_) | LibraryError::RateLimited(_) | LibraryError::ServerError(..)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            LibraryError::from_http_status(401, "expired"),
            LibraryError::AuthError(_)
        ));
        assert!(matches!(
            LibraryError::from_http_status(403, "rules"),
            LibraryError::PermissionDenied(_)
        ));
        assert!(matches!(
            LibraryError::from_http_status(404, "missing"),
            LibraryError::NotFound(_)
        ));
        assert!(matches!(
            LibraryError::from_http_status(409, "exists"),
            LibraryError::AlreadyExists(_)
        ));
        assert!(matches!(
            LibraryError::from_http_status(400, "bad request"),
            LibraryError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for status in [500, 502, 503] {
            let err = LibraryError::from_http_status(status, "unavailable");
            assert!(matches!(err, LibraryError::ServerError(s, _) if s == status));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_rate_limit_carries_delay() {
        let err = LibraryError::from_http_status(429, "slow down");
        assert!(err.is_retryable());
        assert_eq!(err.retry_after_ms(), Some(1000));
        assert_eq!(err.http_status(), Some(429));
    }

    #[test]
    fn test_client_errors_not_retryable() {
        assert!(!LibraryError::from_http_status(400, "bad").is_retryable());
        assert!(!LibraryError::from_http_status(404, "gone").is_retryable());
        assert!(!LibraryError::Config("missing project".into()).is_retryable());
    }

    #[test]
    fn test_http_status_getter() {
        assert_eq!(
            LibraryError::ServerError(502, "bad gateway".into()).http_status(),
            Some(502)
        );
        assert_eq!(LibraryError::NotFound("doc".into()).http_status(), Some(404));
        assert_eq!(LibraryError::InvalidResponse("x".into()).http_status(), None);
    }
}
