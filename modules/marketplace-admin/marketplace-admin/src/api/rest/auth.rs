//! Bearer authentication for the console routes.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use console_errors::Problem;
use console_security::SessionContext;

use crate::api::rest::error::domain_error_to_problem;
use crate::domain::error::DomainError;
use crate::domain::session::SessionGate;
use crate::errors::ErrorCode;

/// Extractor for the [`SessionContext`] inserted by [`require_session`].
#[derive(Debug, Clone)]
pub struct Session(pub SessionContext);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(Session)
            .ok_or_else(|| {
                ErrorCode::INTERNAL.with_context(
                    "session middleware not configured",
                    parts.uri.path(),
                    None,
                )
            })
    }
}

/// Authenticate the bearer token and gate the principal.
///
/// CORS preflights pass through. A missing or rejected token yields 401; a
/// non-admin principal yields 403 after its backend session was revoked.
pub async fn require_session(
    State(gate): State<Arc<SessionGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_preflight_request(request.method(), request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_owned();
    let Some(token) = extract_bearer_token(request.headers()) else {
        return domain_error_to_problem(
            &DomainError::Unauthenticated("missing bearer token".to_owned()),
            &path,
        )
        .into_response();
    };

    match gate.authenticate(token).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => domain_error_to_problem(&e, &path).into_response(),
    }
}

/// Extract Bearer token from Authorization header
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(axum::http::header::ORIGIN)
        && headers.contains_key(axum::http::header::ACCESS_CONTROL_REQUEST_METHOD)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer  "));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer mem.abc "));
        assert_eq!(extract_bearer_token(&headers), Some("mem.abc"));
    }
}
