//! Data exchanged with the backend auth service and row storage.

use console_security::{Principal, SecretString};
use uuid::Uuid;

/// One row as returned by row storage: a JSON object keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// User record of the backend auth service.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.email.clone())
    }
}

/// Authenticated backend session.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Lifetime of `access_token` in seconds, when the backend reports it.
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Item of the auth-state-change stream: an event and the session it left behind.
#[derive(Clone, Debug)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
    /// Principal concerned by the event; set for `SignedOut` where `session` is `None`.
    pub user_id: Option<Uuid>,
}

impl AuthStateChange {
    #[must_use]
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            user_id: Some(session.user.id),
            session: Some(session),
        }
    }

    #[must_use]
    pub fn signed_out(user_id: Option<Uuid>) -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
            user_id,
        }
    }
}
