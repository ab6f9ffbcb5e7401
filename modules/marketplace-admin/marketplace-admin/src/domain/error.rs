use backend_sdk::BackendError;
use thiserror::Error;

/// One invalid form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing, expired or revoked session.
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    /// The principal is not an admin; its session has been signed out.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The caller may not act on this partner or row.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Rejected before any backend call.
    #[error("validation failed on {}", fields(.0))]
    Validation(Vec<FieldViolation>),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("failed to {operation}: {source}")]
    Backend {
        operation: String,
        #[source]
        source: BackendError,
    },
}

fn fields(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Wrap a backend failure, naming the operation that was attempted.
    ///
    /// Row-level-policy rejections and conflicts keep their own variants so
    /// that they surface as 403 / 409 rather than as upstream failures.
    pub fn backend(operation: impl Into<String>, source: BackendError) -> Self {
        let operation = operation.into();
        match source {
            BackendError::Unauthorized(msg) => Self::Unauthenticated(msg),
            BackendError::Forbidden(msg) => Self::Forbidden(format!("{operation}: {msg}")),
            BackendError::Conflict(msg) => Self::Conflict(format!("{operation}: {msg}")),
            source => Self::Backend { operation, source },
        }
    }

    /// Operation name of a backend failure, used for list notices.
    #[must_use]
    pub fn failed_operation(&self) -> Option<&str> {
        match self {
            Self::Backend { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
