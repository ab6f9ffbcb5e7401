//! Session state of a single principal, for long-lived clients.
//!
//! The HTTP API is stateless and rebuilds a [`SessionContext`] per request.
//! Clients holding one session for their whole lifetime (the CLI, embedders)
//! use [`SessionStore`] instead: it follows the backend's auth-state-change
//! stream and publishes the resulting [`SessionState`] through a `watch`
//! channel.

use std::sync::atomic::{AtomicU64, Ordering};

use backend_sdk::{AuthEvent, AuthStateChange, Backend};
use console_security::{Principal, Profile, SecretString, SessionContext};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ProvisioningConfig;
use crate::domain::error::DomainError;
use crate::domain::session::SessionGate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub principal: Option<Principal>,
    pub profile: Option<Profile>,
    /// A sign-in or profile refresh is in flight.
    pub loading: bool,
    /// Set when the last principal was turned away by the admin gate.
    pub denied: Option<String>,
    access_token: Option<SecretString>,
}

impl SessionState {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.principal.is_some() && self.profile.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_super_admin)
    }

    #[must_use]
    pub fn can_access_all_data(&self) -> bool {
        self.is_super_admin()
    }

    fn loading(&self) -> Self {
        Self {
            loading: true,
            ..self.clone()
        }
    }

    fn from_context(ctx: &SessionContext) -> Self {
        Self {
            principal: Some(ctx.principal().clone()),
            profile: Some(ctx.profile().clone()),
            loading: false,
            denied: None,
            access_token: Some(SecretString::new(ctx.access_token())),
        }
    }

    fn denied(reason: String) -> Self {
        Self {
            denied: Some(reason),
            ..Self::default()
        }
    }
}

/// Owner of one principal's [`SessionState`].
///
/// Every sign-in, sign-out and auth event bumps a generation counter before
/// awaiting the backend. A result is published only if no newer operation
/// started meanwhile and the caller's token was not cancelled, so a slow
/// profile load can never overwrite a later sign-out.
pub struct SessionStore {
    backend: Backend,
    gate: SessionGate,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Backend, provisioning: &ProvisioningConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            gate: SessionGate::new(backend.clone(), provisioning),
            backend,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Context of the signed-in admin, if any.
    #[must_use]
    pub fn context(&self) -> Option<SessionContext> {
        let state = self.state.borrow();
        match (&state.principal, &state.profile, &state.access_token) {
            (Some(principal), Some(profile), Some(token)) => Some(SessionContext::new(
                principal.clone(),
                profile.clone(),
                token.clone(),
            )),
            _ => None,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionContext, DomainError> {
        let generation = self.begin();
        let result = self.gate.sign_in(email, password).await.map(|(_, ctx)| ctx);
        self.commit_result(generation, &CancellationToken::new(), &result);
        result
    }

    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let token = self.state.send_replace(SessionState::default()).access_token;
        match token {
            Some(token) => self.gate.sign_out(token.expose()).await,
            None => Ok(()),
        }
    }

    /// Apply one auth-state change.
    ///
    /// Events naming another principal than the signed-in one are ignored;
    /// a `SignedIn` with a session is adopted whoever it belongs to.
    #[instrument(skip(self, change, cancel), fields(event = ?change.event))]
    pub async fn handle_auth_change(&self, change: AuthStateChange, cancel: &CancellationToken) {
        let current = self.current();
        let current_id = current.principal.as_ref().map(|p| p.id);
        let concerns_current = change.user_id.is_none() || change.user_id == current_id;

        match (change.event, change.session) {
            (AuthEvent::SignedOut, _) => {
                if concerns_current && current_id.is_some() {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    self.state.send_replace(SessionState::default());
                    info!("signed out");
                }
            }
            (AuthEvent::SignedIn, Some(session)) => {
                self.refresh(session.user.principal(), session.access_token, cancel)
                    .await;
            }
            (_, Some(session)) if concerns_current => {
                self.refresh(session.user.principal(), session.access_token, cancel)
                    .await;
            }
            (_, None) if concerns_current => {
                if let (Some(principal), Some(token)) = (current.principal, current.access_token) {
                    self.refresh(principal, token, cancel).await;
                }
            }
            _ => debug!("event concerns another principal"),
        }
    }

    /// Follow the backend's auth-state-change stream until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut events = self.backend.auth.subscribe();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(change) => self.handle_auth_change(change, &cancel).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "auth events lagged, refreshing current profile");
                        self.handle_auth_change(
                            AuthStateChange {
                                event: AuthEvent::UserUpdated,
                                session: None,
                                user_id: None,
                            },
                            &cancel,
                        )
                        .await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("session store stopped");
    }

    async fn refresh(&self, principal: Principal, token: SecretString, cancel: &CancellationToken) {
        let generation = self.begin();
        let result = self.gate.establish(principal, token).await;
        self.commit_result(generation, cancel, &result);
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| *s = s.loading());
        generation
    }

    fn commit_result(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        result: &Result<SessionContext, DomainError>,
    ) {
        let next = match result {
            Ok(ctx) => Some(SessionState::from_context(ctx)),
            Err(DomainError::AccessDenied(reason)) => Some(SessionState::denied(reason.clone())),
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                None
            }
        };

        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "superseded session result dropped");
                return false;
            }
            match next {
                Some(next) if !cancel.is_cancelled() => {
                    *state = next;
                    true
                }
                _ => std::mem::replace(&mut state.loading, false),
            }
        });
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::test_support::{Fixture, PASSWORD};
    use backend_sdk::AuthApi;
    use console_security::{AdminType, Role};
    use std::time::Duration;

    fn store(fx: &Fixture) -> SessionStore {
        SessionStore::new(fx.backend_handle(), &fx.config.provisioning)
    }

    #[tokio::test]
    async fn sign_in_publishes_admin_state() {
        let fx = Fixture::new();
        fx.user("root@example.com", Role::Admin, Some(AdminType::SuperAdmin));
        let store = store(&fx);
        let mut rx = store.subscribe();

        store.sign_in("root@example.com", PASSWORD).await.unwrap();

        rx.changed().await.unwrap();
        let state = store.current();
        assert!(state.is_signed_in());
        assert!(state.is_super_admin() && state.can_access_all_data());
        assert!(!state.loading);
        assert!(store.context().is_some());
    }

    #[tokio::test]
    async fn non_admin_sign_in_is_denied_and_revoked() {
        let fx = Fixture::new();
        fx.user("user@example.com", Role::User, None);
        let store = store(&fx);

        let err = store.sign_in("user@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied(_)));

        let state = store.current();
        assert!(!state.is_signed_in());
        assert!(state.denied.is_some());
        assert!(store.context().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_state_and_revokes_token() {
        let fx = Fixture::new();
        fx.user("pa@example.com", Role::Admin, None);
        let store = store(&fx);
        let ctx = store.sign_in("pa@example.com", PASSWORD).await.unwrap();

        store.sign_out().await.unwrap();

        assert_eq!(store.current(), SessionState::default());
        assert!(!fx.backend.is_session_active(ctx.access_token()));
    }

    #[tokio::test]
    async fn stale_refresh_is_not_committed() {
        let fx = Fixture::new();
        fx.user("pa@example.com", Role::Admin, None);
        let store = store(&fx);
        let ctx = store.sign_in("pa@example.com", PASSWORD).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        store
            .refresh(
                ctx.principal().clone(),
                SecretString::new("mem.other"),
                &cancel,
            )
            .await;

        assert!(!store.current().loading);
        let current = store.context().unwrap();
        assert_eq!(current.access_token(), ctx.access_token());
    }

    #[tokio::test]
    async fn sign_out_during_refresh_wins() {
        let fx = Fixture::new();
        fx.user("pa@example.com", Role::Admin, None);
        let store = store(&fx);
        let ctx = store.sign_in("pa@example.com", PASSWORD).await.unwrap();

        // Same steps as `refresh`, with a sign-out landing before the commit.
        let generation = store.begin();
        assert!(store.current().loading);
        let result = store
            .gate
            .establish(ctx.principal().clone(), SecretString::new(ctx.access_token()))
            .await;
        assert!(result.is_ok());

        store.sign_out().await.unwrap();
        store.commit_result(generation, &CancellationToken::new(), &result);

        assert_eq!(store.current(), SessionState::default());
        assert!(store.context().is_none());
    }

    #[tokio::test]
    async fn run_follows_backend_sign_out() {
        let fx = Fixture::new();
        fx.user("pa@example.com", Role::Admin, None);
        let store = std::sync::Arc::new(store(&fx));
        let ctx = store.sign_in("pa@example.com", PASSWORD).await.unwrap();

        let cancel = CancellationToken::new();
        let runner = tokio::spawn({
            let store = store.clone();
            let cancel = cancel.clone();
            async move { store.run(cancel).await }
        });
        let mut rx = store.subscribe();
        // let the runner subscribe to the backend stream
        tokio::time::sleep(Duration::from_millis(20)).await;

        fx.backend.sign_out(ctx.access_token()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.is_signed_in()))
            .await
            .unwrap()
            .unwrap();

        cancel.cancel();
        runner.await.unwrap();
    }
}
