//! Discovery backend error definitions.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Backend operation, used to label errors, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Publish,
    Unpublish,
    Update,
    Query,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Publish => "publish",
            Operation::Unpublish => "unpublish",
            Operation::Update => "update",
            Operation::Query => "query",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while talking to a discovery backend.
///
/// Callers handle every variant the same way; the split exists so operators
/// can tell an outage from a refusal from a slow backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("Cannot reach discovery backend at {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The backend answered but refused the operation.
    #[error("Discovery backend rejected {operation}: {reason}")]
    Rejected { operation: Operation, reason: String },

    /// The operation did not complete before its deadline.
    #[error("Discovery {operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: Operation, after: Duration },
}

impl BackendError {
    pub fn rejected(operation: Operation, reason: impl Into<String>) -> Self {
        BackendError::Rejected {
            operation,
            reason: reason.into(),
        }
    }

    pub fn connection(endpoint: impl Into<String>, reason: impl fmt::Display) -> Self {
        BackendError::ConnectionFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::ConnectionFailed { .. } => "connection_failed",
            BackendError::Rejected { .. } => "rejected",
            BackendError::Timeout { .. } => "timeout",
        }
    }
}

/// Result type for discovery operations.
pub type BackendResult<T> = Result<T, BackendError>;
