use backend_sdk::BackendError;
use console_errors::{Problem, ValidationViolation};

use crate::domain::error::DomainError;
use crate::errors::ErrorCode;

pub type ApiResult<T> = Result<T, Problem>;

/// Map a domain error to an RFC 9457 problem using the console error catalog.
pub fn domain_error_to_problem(e: &DomainError, instance: &str) -> Problem {
    let trace_id = tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string());

    match e {
        DomainError::Unauthenticated(msg) => {
            tracing::debug!(error = %msg, "request not authenticated");
            ErrorCode::UNAUTHENTICATED.with_context(
                "Missing, expired or revoked session",
                instance,
                trace_id,
            )
        }
        DomainError::InvalidCredentials => {
            ErrorCode::INVALID_CREDENTIALS.with_context(e.to_string(), instance, trace_id)
        }
        DomainError::AccessDenied(msg) => {
            ErrorCode::ACCESS_DENIED.with_context(msg.clone(), instance, trace_id)
        }
        DomainError::Forbidden(msg) => {
            tracing::warn!(error = %msg, "access forbidden");
            ErrorCode::FORBIDDEN.with_context(msg.clone(), instance, trace_id)
        }
        DomainError::Validation(violations) => ErrorCode::VALIDATION
            .with_context(e.to_string(), instance, trace_id)
            .with_errors(
                violations
                    .iter()
                    .map(|v| ValidationViolation {
                        field: v.field.clone(),
                        message: v.message.clone(),
                    })
                    .collect(),
            ),
        DomainError::NotFound(_) => {
            ErrorCode::NOT_FOUND.with_context(e.to_string(), instance, trace_id)
        }
        DomainError::Conflict(msg) => {
            ErrorCode::CONFLICT.with_context(msg.clone(), instance, trace_id)
        }
        DomainError::Backend { operation, source } => {
            tracing::error!(error = %source, operation, "backend call failed");
            let def = match source {
                BackendError::Timeout => ErrorCode::UPSTREAM_TIMEOUT,
                BackendError::Decode(_) => ErrorCode::INTERNAL,
                _ => ErrorCode::UPSTREAM,
            };
            def.with_context(format!("failed to {operation}"), instance, trace_id)
        }
    }
}

/// Implement `From<DomainError>` for `Problem` so `?` works in handlers.
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(&e, "/")
    }
}
