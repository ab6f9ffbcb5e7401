use std::sync::Arc;

use backend_sdk::{Direction, Query, RowStore};
use console_security::SessionContext;
use marketplace_admin_sdk::{Subscription, UserConsumption};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::domain::error::DomainError;
use crate::domain::rows::decode_rows;
use crate::domain::users::require_super_admin;

pub const SUBSCRIPTIONS_TABLE: &str = "subscriptions";
pub const CONSUMPTION_TABLE: &str = "user_consumption";

/// Read-only billing views, reserved to super admins.
pub struct BillingService {
    rows: Arc<dyn RowStore>,
}

impl BillingService {
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    pub async fn subscriptions(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.load(ctx, SUBSCRIPTIONS_TABLE, "subscription").await
    }

    pub async fn consumption(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<UserConsumption>, DomainError> {
        self.load(ctx, CONSUMPTION_TABLE, "consumption").await
    }

    #[instrument(skip(self, ctx), fields(principal_id = %ctx.principal_id()))]
    async fn load<T: DeserializeOwned>(
        &self,
        ctx: &SessionContext,
        table: &str,
        what: &str,
    ) -> Result<Vec<T>, DomainError> {
        require_super_admin(ctx, "billing")?;
        let rows = self
            .rows
            .select(
                &Query::table(table)
                    .order("created_at", Direction::Desc)
                    .bearer(ctx.access_token()),
            )
            .await
            .map_err(|e| DomainError::backend(format!("load {what} list"), e))?;
        decode_rows(rows, what)
    }
}
