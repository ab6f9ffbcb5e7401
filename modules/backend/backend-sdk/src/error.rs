//! Error types for backend calls.

use thiserror::Error;

/// Errors surfaced by any backend implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Email/password pair rejected by the auth service.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Missing, expired or malformed bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Rejected by the backend's row-level policies.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Unique or foreign-key constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Request rejected as malformed (unknown column, bad filter value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend request timed out")]
    Timeout,

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// True for errors caused by the caller's identity or permissions.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::Unauthorized(_) | Self::Forbidden(_)
        )
    }

    /// Map an HTTP status and message to the closest variant.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::InvalidRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            408 | 504 => Self::Timeout,
            _ => Self::Http { status, message },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            BackendError::from_status(403, "rls"),
            BackendError::Forbidden("rls".to_owned())
        );
        assert_eq!(BackendError::from_status(504, "gw"), BackendError::Timeout);
        assert!(matches!(
            BackendError::from_status(500, "boom"),
            BackendError::Http { status: 500, .. }
        ));
        assert!(BackendError::from_status(401, "expired").is_auth());
        assert!(!BackendError::from_status(409, "dup").is_auth());
    }
}
