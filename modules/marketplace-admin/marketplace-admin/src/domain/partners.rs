use std::sync::Arc;

use backend_sdk::{Direction, Query, RowStore};
use console_security::{PartnerId, SessionContext};
use marketplace_admin_sdk::{AccessApi, Partner, Record};
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::access::{AccessResolver, PARTNERS_TABLE};
use crate::domain::error::DomainError;
use crate::domain::forms::{FormValues, prepare, prepare_patch, targets_existing_row};
use crate::domain::rows::{decode_row, decode_rows, encode_row};

/// Partner accounts, scoped like the activity tables.
///
/// Partner admins only ever own the partners they create: `user_id` is forced
/// to the caller on insert and cannot be reassigned. Every write drops the resolver
/// cache since it may change who owns what.
pub struct PartnerService {
    rows: Arc<dyn RowStore>,
    access: Arc<AccessResolver>,
}

impl PartnerService {
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>, access: Arc<AccessResolver>) -> Self {
        Self { rows, access }
    }

    #[instrument(skip_all, fields(principal_id = %ctx.principal_id()))]
    pub async fn list(&self, ctx: &SessionContext) -> Result<Vec<Partner>, DomainError> {
        let mut query = Query::table(PARTNERS_TABLE)
            .order("created_at", Direction::Desc)
            .bearer(ctx.access_token());

        if !ctx.can_access_all_data() {
            let ids = self.access.partner_ids(ctx).await;
            if ids.is_empty() {
                debug!("no owned partner, skipping query");
                return Ok(Vec::new());
            }
            query = query.in_list("id", ids);
        }

        let rows = self
            .rows
            .select(&query)
            .await
            .map_err(|e| DomainError::backend("load partner list", e))?;
        decode_rows(rows, Partner::LABEL)
    }

    /// Insert a partner, or update the one named by the form's `id` with
    /// the submitted fields only.
    #[instrument(skip_all, fields(principal_id = %ctx.principal_id()))]
    pub async fn save(&self, ctx: &SessionContext, form: FormValues) -> Result<Partner, DomainError> {
        let saved = if targets_existing_row(&form) {
            self.update(ctx, prepare_patch::<Partner>(form)?).await?
        } else {
            self.insert(ctx, prepare::<Partner>(form)?).await?
        };

        self.access.invalidate_all();
        info!(id = ?saved.id, "partner saved");
        Ok(saved)
    }

    async fn insert(
        &self,
        ctx: &SessionContext,
        mut values: FormValues,
    ) -> Result<Partner, DomainError> {
        if !ctx.can_access_all_data() {
            check_owner(ctx, &values)?;
            values.insert("user_id".to_owned(), Value::String(ctx.principal_id().to_string()));
        }

        let partner: Partner = serde_json::from_value(Value::Object(values))
            .map_err(|e| DomainError::validation("form", e.to_string()))?;
        let row = self
            .rows
            .insert(
                &Query::table(PARTNERS_TABLE).bearer(ctx.access_token()),
                encode_row(&partner)?,
            )
            .await
            .map_err(|e| DomainError::backend("save partner", e))?;
        decode_row(row, Partner::LABEL)
    }

    async fn update(
        &self,
        ctx: &SessionContext,
        mut patch: FormValues,
    ) -> Result<Partner, DomainError> {
        let id = patch
            .remove("id")
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| DomainError::validation("id", "must be an integer"))?;
        if !self.access.can_access_partner(ctx, id).await {
            return Err(DomainError::Forbidden(format!("partner {id} is not accessible")));
        }
        if !ctx.can_access_all_data() && patch.contains_key("user_id") {
            check_owner(ctx, &patch)?;
            if patch.get("user_id").is_some_and(Value::is_null) {
                return Err(DomainError::Forbidden(
                    "partners cannot be detached from their administrator".to_owned(),
                ));
            }
        }
        if patch.is_empty() {
            return Err(DomainError::validation("form", "has no field to update"));
        }

        let updated = self
            .rows
            .update(
                &Query::table(PARTNERS_TABLE)
                    .eq("id", id)
                    .bearer(ctx.access_token()),
                patch,
            )
            .await
            .map_err(|e| DomainError::backend("save partner", e))?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::NotFound(format!("partner {id}")))?;
        decode_row(row, Partner::LABEL)
    }

    #[instrument(skip(self, ctx), fields(principal_id = %ctx.principal_id()))]
    pub async fn delete(&self, ctx: &SessionContext, id: PartnerId) -> Result<bool, DomainError> {
        if !self.access.can_access_partner(ctx, id).await {
            return Err(DomainError::Forbidden(format!("partner {id} is not accessible")));
        }
        let removed = self
            .rows
            .delete(
                &Query::table(PARTNERS_TABLE)
                    .eq("id", id)
                    .bearer(ctx.access_token()),
            )
            .await
            .map_err(|e| DomainError::backend("delete partner", e))?;

        if removed > 0 {
            self.access.invalidate_all();
            info!(id, "partner deleted");
        }
        Ok(removed > 0)
    }
}

/// Partner admins may only name themselves as owner.
fn check_owner(ctx: &SessionContext, values: &FormValues) -> Result<(), DomainError> {
    if requested_owner(values)?.is_some_and(|owner| owner != ctx.principal_id()) {
        return Err(DomainError::Forbidden(
            "partners can only be owned by their administrator".to_owned(),
        ));
    }
    Ok(())
}

fn requested_owner(values: &FormValues) -> Result<Option<Uuid>, DomainError> {
    match values.get("user_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| DomainError::validation("user_id", "must be a UUID")),
        Some(_) => Err(DomainError::validation("user_id", "must be a UUID")),
    }
}
