//! Domain errors for the Taxonomist classification pipeline.

use std::time::Duration;
use thiserror::Error;

/// Errors reported by a [`ClassifierClient`](crate::domain::ports::ClassifierClient).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimited,

    /// Server error from the classifier (HTTP 5xx, 529)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid or missing credentials (HTTP 401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Request rejected as malformed (HTTP 400/404/413)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The phase circuit breaker is open; the call was not attempted
    #[error("Circuit breaker open for phase '{phase}'")]
    CircuitOpen { phase: String },

    /// The surrounding request was cancelled
    #[error("Classifier call cancelled")]
    Cancelled,
}

impl ClassifierError {
    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Server { .. } | Self::Network(_) | Self::Timeout
        )
    }

    /// Returns true if retrying or re-shaping the request cannot help
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::InvalidRequest(_))
    }
}

/// A classifier reply that could not be turned into a structural result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Empty {field} name at position {position}")]
    EmptyName { field: &'static str, position: usize },

    #[error("Expected {expected} classifications, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Failure of a single classifier attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl AttemptError {
    /// Parse, validation and transient transport failures are retried at the
    /// same granularity; an open circuit or a permanent error is not.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Classifier(e) => e.is_transient(),
            Self::Response(_) => true,
        }
    }

    /// Errors that must abort the whole request instead of falling back.
    pub const fn is_irrecoverable(&self) -> bool {
        match self {
            Self::Classifier(e) => e.is_permanent() || matches!(e, ClassifierError::Cancelled),
            Self::Response(_) => false,
        }
    }
}

/// Top-level errors from `ClassificationService::classify`.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Classification cancelled")]
    Cancelled,

    #[error("Classification exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Batch {batch} failed irrecoverably: {source}")]
    BatchFailed {
        batch: usize,
        #[source]
        source: ClassifierError,
    },

    #[error("Batch task failed: {0}")]
    TaskFailed(String),
}

pub type ClassifyResult<T> = Result<T, ClassifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ClassifierError::RateLimited.is_transient());
        assert!(ClassifierError::Timeout.is_transient());
        assert!(ClassifierError::Server {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(!ClassifierError::CircuitOpen {
            phase: "classification".into()
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(ClassifierError::Authentication("bad key".into()).is_permanent());
        assert!(ClassifierError::InvalidRequest("too long".into()).is_permanent());
        assert!(!ClassifierError::RateLimited.is_permanent());
    }

    #[test]
    fn test_attempt_error_classification() {
        let parse: AttemptError = ResponseError::Malformed("not json".into()).into();
        assert!(parse.is_retryable());
        assert!(!parse.is_irrecoverable());

        let open: AttemptError = ClassifierError::CircuitOpen {
            phase: "classification".into(),
        }
        .into();
        assert!(!open.is_retryable());
        assert!(!open.is_irrecoverable());

        let auth: AttemptError = ClassifierError::Authentication("401".into()).into();
        assert!(!auth.is_retryable());
        assert!(auth.is_irrecoverable());

        let cancelled: AttemptError = ClassifierError::Cancelled.into();
        assert!(cancelled.is_irrecoverable());
    }
}
