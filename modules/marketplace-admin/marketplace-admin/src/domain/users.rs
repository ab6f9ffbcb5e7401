use std::sync::Arc;

use backend_sdk::{Direction, Query, RowStore};
use console_security::{Profile, SessionContext};
use marketplace_admin_sdk::UserUpdate;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::access::AccessResolver;
use crate::domain::error::DomainError;
use crate::domain::rows::{decode_row, decode_rows, encode_row};
use crate::domain::session::PROFILES_TABLE;

pub(crate) fn require_super_admin(ctx: &SessionContext, what: &str) -> Result<(), DomainError> {
    if ctx.is_super_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "{what} is reserved to super administrators"
        )))
    }
}

/// Profile management. Every operation requires a super admin.
pub struct UserService {
    rows: Arc<dyn RowStore>,
    access: Arc<AccessResolver>,
}

impl UserService {
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>, access: Arc<AccessResolver>) -> Self {
        Self { rows, access }
    }

    #[instrument(skip_all, fields(principal_id = %ctx.principal_id()))]
    pub async fn list(&self, ctx: &SessionContext) -> Result<Vec<Profile>, DomainError> {
        require_super_admin(ctx, "user management")?;
        let rows = self
            .rows
            .select(
                &Query::table(PROFILES_TABLE)
                    .order("created_at", Direction::Desc)
                    .bearer(ctx.access_token()),
            )
            .await
            .map_err(|e| DomainError::backend("load user list", e))?;
        decode_rows(rows, "profile")
    }

    /// Apply `update` to the profile `id` and return it as stored.
    #[instrument(skip(self, ctx), fields(principal_id = %ctx.principal_id()))]
    pub async fn update(
        &self,
        ctx: &SessionContext,
        id: Uuid,
        update: UserUpdate,
    ) -> Result<Profile, DomainError> {
        require_super_admin(ctx, "user management")?;
        if update.is_empty() {
            return Err(DomainError::validation("update", "no field to change"));
        }

        let updated = self
            .rows
            .update(
                &Query::table(PROFILES_TABLE)
                    .eq("id", id.to_string())
                    .bearer(ctx.access_token()),
                encode_row(&update)?,
            )
            .await
            .map_err(|e| DomainError::backend("update user", e))?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::NotFound(format!("user {id}")))?;

        self.access.invalidate(id);
        info!(user_id = %id, "profile updated");
        decode_row(row, "profile")
    }

    /// Delete a profile. A super admin cannot delete their own.
    #[instrument(skip(self, ctx), fields(principal_id = %ctx.principal_id()))]
    pub async fn delete(&self, ctx: &SessionContext, id: Uuid) -> Result<bool, DomainError> {
        require_super_admin(ctx, "user management")?;
        if id == ctx.principal_id() {
            return Err(DomainError::Forbidden(
                "administrators cannot delete their own account".to_owned(),
            ));
        }

        let removed = self
            .rows
            .delete(
                &Query::table(PROFILES_TABLE)
                    .eq("id", id.to_string())
                    .bearer(ctx.access_token()),
            )
            .await
            .map_err(|e| DomainError::backend("delete user", e))?;

        if removed > 0 {
            self.access.invalidate(id);
            info!(user_id = %id, "profile deleted");
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::test_support::Fixture;
    use console_security::{AdminType, Role};

    fn service(fx: &Fixture) -> UserService {
        let rows = fx.backend_handle().rows;
        UserService::new(rows.clone(), Arc::new(AccessResolver::new(rows)))
    }

    #[tokio::test]
    async fn partner_admin_is_refused() {
        let fx = Fixture::new();
        let ctx = fx.signed_in("pa@example.com", Role::Admin, None).await;
        let svc = service(&fx);

        assert!(matches!(svc.list(&ctx).await, Err(DomainError::Forbidden(_))));
        assert!(matches!(
            svc.delete(&ctx, Uuid::new_v4()).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn super_admin_promotes_a_user() {
        let fx = Fixture::new();
        let ctx = fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        let (user, _) = fx.user("someone@example.com", Role::User, None);
        let svc = service(&fx);

        let profile = svc
            .update(
                &ctx,
                user.id,
                UserUpdate {
                    role: Some(Role::Admin),
                    admin_type: Some(Some(AdminType::PartnerAdmin)),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();

        assert!(profile.is_admin());
        assert_eq!(profile.admin_type, Some(AdminType::PartnerAdmin));
        assert_eq!(svc.list(&ctx).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_update_and_self_delete_are_rejected() {
        let fx = Fixture::new();
        let ctx = fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        let svc = service(&fx);

        assert!(matches!(
            svc.update(&ctx, Uuid::new_v4(), UserUpdate::default()).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.delete(&ctx, ctx.principal_id()).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn unknown_user_update_is_not_found() {
        let fx = Fixture::new();
        let ctx = fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;

        let err = service(&fx)
            .update(
                &ctx,
                Uuid::new_v4(),
                UserUpdate {
                    first_name: Some("Ana".into()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
