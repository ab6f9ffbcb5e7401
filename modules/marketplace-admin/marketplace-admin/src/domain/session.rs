//! Admin gate turning backend auth sessions into [`SessionContext`]s.

use backend_sdk::{AuthSession, AuthUser, Backend, BackendError, Query};
use console_security::{Principal, Profile, Role, SecretString, SessionContext};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::ProvisioningConfig;
use crate::domain::error::DomainError;
use crate::domain::rows::{decode_row, encode_row};

pub const PROFILES_TABLE: &str = "profiles";

/// Stateless admin gate.
///
/// A context is produced only for principals whose profile carries the
/// `admin` role. Any other principal has its backend session revoked before
/// the error is returned, so no partner or activity data is ever loaded on
/// its behalf.
pub struct SessionGate {
    backend: Backend,
    default_role: Role,
}

impl SessionGate {
    #[must_use]
    pub fn new(backend: Backend, provisioning: &ProvisioningConfig) -> Self {
        Self {
            backend,
            default_role: provisioning.default_role,
        }
    }

    /// Resolve the principal behind a bearer token and gate it.
    ///
    /// # Errors
    /// - `Unauthenticated` if the backend rejects the token
    /// - `AccessDenied` if the principal is not an admin
    #[instrument(skip_all)]
    pub async fn authenticate(&self, bearer: &str) -> Result<SessionContext, DomainError> {
        let user = self
            .backend
            .auth
            .get_user(bearer)
            .await
            .map_err(|e| match e {
                e if e.is_auth() => DomainError::Unauthenticated(e.to_string()),
                e => DomainError::backend("verify session", e),
            })?;
        self.establish(user.principal(), SecretString::new(bearer))
            .await
    }

    /// Load (or provision) the principal's profile and apply the admin check.
    #[instrument(skip_all, fields(principal_id = %principal.id))]
    pub async fn establish(
        &self,
        principal: Principal,
        access_token: SecretString,
    ) -> Result<SessionContext, DomainError> {
        let profile = self
            .load_or_provision(&principal, access_token.expose())
            .await?;

        if !profile.is_admin() {
            warn!(role = %profile.role, "principal is not an admin, revoking its session");
            if let Err(e) = self.backend.auth.sign_out(access_token.expose()).await {
                warn!(error = %e, "failed to revoke non-admin session");
            }
            return Err(DomainError::AccessDenied(
                "this console is reserved to administrators".to_owned(),
            ));
        }

        debug!(
            super_admin = profile.is_super_admin(),
            "admin session established"
        );
        Ok(SessionContext::new(principal, profile, access_token))
    }

    async fn load_or_provision(
        &self,
        principal: &Principal,
        token: &str,
    ) -> Result<Profile, DomainError> {
        let query = Query::table(PROFILES_TABLE)
            .eq("id", principal.id.to_string())
            .bearer(token);
        let existing = self
            .backend
            .rows
            .select_one(&query)
            .await
            .map_err(|e| DomainError::backend("load profile", e))?;

        if let Some(row) = existing {
            return decode_row(row, "profile");
        }

        let profile = Profile::provisioned(principal, self.default_role);
        let stored = self
            .backend
            .rows
            .insert(
                &Query::table(PROFILES_TABLE).bearer(token),
                encode_row(&profile)?,
            )
            .await
            .map_err(|e| DomainError::backend("provision profile", e))?;
        info!(role = %profile.role, "provisioned missing profile");
        decode_row(stored, "profile")
    }

    /// Password sign-in followed by the admin gate.
    ///
    /// # Errors
    /// - `InvalidCredentials` for a rejected email/password pair
    /// - `AccessDenied` if the principal is not an admin
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthSession, SessionContext), DomainError> {
        let session = self
            .backend
            .auth
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| match e {
                BackendError::InvalidCredentials => DomainError::InvalidCredentials,
                e => DomainError::backend("sign in", e),
            })?;
        let ctx = self
            .establish(session.user.principal(), session.access_token.clone())
            .await?;
        Ok((session, ctx))
    }

    #[instrument(skip(self, password, metadata))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, DomainError> {
        let user = self
            .backend
            .auth
            .sign_up(email, password, metadata)
            .await
            .map_err(|e| match e {
                BackendError::InvalidRequest(msg) => DomainError::validation("password", msg),
                e => DomainError::backend("sign up", e),
            })?;
        info!(user_id = %user.id, "account created");
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), DomainError> {
        self.backend
            .auth
            .sign_out(access_token)
            .await
            .map_err(|e| DomainError::backend("sign out", e))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::test_support::{Fixture, PASSWORD};
    use console_security::AdminType;
    use memory_backend_plugin::OpKind;

    #[tokio::test]
    async fn missing_profile_is_provisioned_once_then_gated() {
        let fx = Fixture::new();
        let user = fx.backend.seed_user("new@example.com", PASSWORD);

        let err = fx
            .gate()
            .sign_in("new@example.com", PASSWORD)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::AccessDenied(_)));
        let profiles = fx.backend.rows(PROFILES_TABLE);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["id"], user.id.to_string());
        assert_eq!(profiles[0]["role"], "user");
        assert_eq!(fx.backend.operations_of(PROFILES_TABLE, OpKind::Insert), 1);
    }

    #[tokio::test]
    async fn provisioning_with_admin_default_passes_the_gate() {
        let fx = Fixture::with_default_role(Role::Admin);
        fx.backend.seed_user("new@example.com", PASSWORD);

        let (_, ctx) = fx
            .gate()
            .sign_in("new@example.com", PASSWORD)
            .await
            .unwrap();

        assert!(ctx.profile().is_admin());
        assert!(!ctx.is_super_admin());
        assert_eq!(fx.backend.rows(PROFILES_TABLE).len(), 1);
    }

    #[tokio::test]
    async fn non_admin_is_signed_out_before_any_partner_query() {
        let fx = Fixture::new();
        let (user, _) = fx.user("editor@example.com", Role::Editor, None);
        let mut events = fx.backend_handle().auth.subscribe();

        let err = fx
            .gate()
            .sign_in("editor@example.com", PASSWORD)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::AccessDenied(_)));
        assert_eq!(fx.backend.operations("partners"), 0);
        // SignedIn then SignedOut for the same principal.
        events.recv().await.unwrap();
        let out = events.recv().await.unwrap();
        assert_eq!(out.user_id, Some(user.id));
    }

    #[tokio::test]
    async fn super_admin_context_carries_flags() {
        let fx = Fixture::new();
        fx.user("root@example.com", Role::Admin, Some(AdminType::SuperAdmin));

        let (session, ctx) = fx
            .gate()
            .sign_in("root@example.com", PASSWORD)
            .await
            .unwrap();

        assert!(ctx.can_access_all_data());
        assert_eq!(ctx.access_token(), session.access_token.expose());

        let again = fx.gate().authenticate(ctx.access_token()).await.unwrap();
        assert_eq!(again.principal_id(), ctx.principal_id());
    }

    #[tokio::test]
    async fn bad_password_and_unknown_token() {
        let fx = Fixture::new();
        fx.user("root@example.com", Role::Admin, Some(AdminType::SuperAdmin));

        assert!(matches!(
            fx.gate().sign_in("root@example.com", "wrong").await,
            Err(DomainError::InvalidCredentials)
        ));
        assert!(matches!(
            fx.gate().authenticate("not-a-token").await,
            Err(DomainError::Unauthenticated(_))
        ));
    }
}
