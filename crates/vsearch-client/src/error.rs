//! Transport error types.

use thiserror::Error;
use vsearch_models::{FailureKind, UploadFailure};

/// Result type for transport and orchestrator operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the transport and the session orchestrators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local input rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The server could not be reached
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Success status, but the payload had an unexpected shape
    #[error("Invalid response: {0}")]
    Protocol(String),

    /// Cancelled by the caller
    #[error("Operation aborted")]
    Aborted,
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a server error from a status code and an already-resolved message.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Validation(_) => FailureKind::Validation,
            ClientError::Network(_) => FailureKind::Network,
            ClientError::Server { .. } => FailureKind::Server,
            ClientError::Protocol(_) => FailureKind::Protocol,
            ClientError::Aborted => FailureKind::Aborted,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if a caller-level retry could succeed. The transport itself
    /// never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ClientError::Aborted)
    }

    /// Snapshot of this error for the session state.
    pub fn to_failure(&self) -> UploadFailure {
        let message = match self {
            ClientError::Validation(msg) | ClientError::Protocol(msg) => msg.clone(),
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Network(e) => e.to_string(),
            ClientError::Aborted => return UploadFailure::aborted(),
        };
        let status = match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        };
        UploadFailure::new(self.kind(), message, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        let err = ClientError::from_http_status(404, "Video 'x' not found.");
        assert!(matches!(err, ClientError::Server { status: 404, .. }));
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(err.kind(), FailureKind::Server);
        assert_eq!(err.to_string(), "Server error (404): Video 'x' not found.");
    }

    #[test]
    fn test_retry_classification() {
        assert!(ClientError::from_http_status(503, "unavailable").is_retryable());
        assert!(ClientError::from_http_status(429, "slow down").is_retryable());
        assert!(!ClientError::from_http_status(400, "bad").is_retryable());
        assert!(!ClientError::Aborted.is_retryable());
        assert!(!ClientError::validation("empty").is_retryable());
    }

    #[test]
    fn test_to_failure() {
        let failure = ClientError::from_http_status(500, "boom").to_failure();
        assert_eq!(failure.kind, FailureKind::Server);
        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.message, "boom");

        let aborted = ClientError::Aborted.to_failure();
        assert_eq!(aborted.kind, FailureKind::Aborted);
        assert_eq!(aborted.status, None);
    }
}
