use std::sync::Arc;

use backend_sdk::{Direction, Query, RowStore};
use console_security::SessionContext;
use marketplace_admin_sdk::{Record, VoyanceConsultation, VoyanceMedium, VoyanceReview};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::domain::access::AccessResolver;
use crate::domain::error::DomainError;
use crate::domain::rows::decode_rows;
use crate::domain::verticals::VerticalService;

pub const CONSULTATIONS_TABLE: &str = "voyance_consultations";
pub const REVIEWS_TABLE: &str = "voyance_reviews";

/// Consultations and reviews attached to the mediums the caller can see.
pub struct VoyanceService {
    rows: Arc<dyn RowStore>,
    mediums: VerticalService<VoyanceMedium>,
}

impl VoyanceService {
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>, access: Arc<AccessResolver>) -> Self {
        Self {
            mediums: VerticalService::new(rows.clone(), access),
            rows,
        }
    }

    pub async fn consultations(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<VoyanceConsultation>, DomainError> {
        self.load(ctx, CONSULTATIONS_TABLE, "consultation").await
    }

    pub async fn reviews(&self, ctx: &SessionContext) -> Result<Vec<VoyanceReview>, DomainError> {
        self.load(ctx, REVIEWS_TABLE, "review").await
    }

    #[instrument(skip(self, ctx), fields(principal_id = %ctx.principal_id()))]
    async fn load<T: DeserializeOwned>(
        &self,
        ctx: &SessionContext,
        table: &str,
        what: &str,
    ) -> Result<Vec<T>, DomainError> {
        let mut query = Query::table(table)
            .order("created_at", Direction::Desc)
            .bearer(ctx.access_token());

        if !ctx.can_access_all_data() {
            let medium_ids: Vec<i64> = self
                .mediums
                .fetch(ctx)
                .await?
                .iter()
                .filter_map(Record::id)
                .collect();
            if medium_ids.is_empty() {
                debug!("no visible medium");
                return Ok(Vec::new());
            }
            query = query.in_list("medium_id", medium_ids);
        }

        let rows = self
            .rows
            .select(&query)
            .await
            .map_err(|e| DomainError::backend(format!("load {what} list"), e))?;
        decode_rows(rows, what)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::test_support::{Fixture, object};
    use console_security::{ActivityType, AdminType, Role};
    use serde_json::json;

    fn seed(fx: &Fixture) {
        fx.backend.seed_rows(
            CONSULTATIONS_TABLE,
            [
                object(json!({"id": 1, "medium_id": 3, "status": "done"})),
                object(json!({"id": 2, "medium_id": 4, "status": "booked"})),
            ],
        );
        fx.backend.seed_rows(
            REVIEWS_TABLE,
            [object(json!({"id": 7, "medium_id": 4, "rating": 5}))],
        );
    }

    fn service(fx: &Fixture) -> VoyanceService {
        let rows = fx.backend_handle().rows;
        VoyanceService::new(rows.clone(), Arc::new(AccessResolver::new(rows)))
    }

    #[tokio::test]
    async fn partner_admin_sees_records_of_own_mediums() {
        let fx = Fixture::new();
        let ctx = fx.signed_in("pa@example.com", Role::Admin, None).await;
        fx.partner(10, Some(ctx.principal_id()));
        fx.activity(ActivityType::VoyanceMedium, 3, Some(10));
        fx.activity(ActivityType::VoyanceMedium, 4, Some(11));
        seed(&fx);
        let svc = service(&fx);

        let consultations = svc.consultations(&ctx).await.unwrap();
        assert_eq!(consultations.len(), 1);
        assert_eq!(consultations[0].medium_id, 3);
        assert!(svc.reviews(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_visible_medium_skips_the_query() {
        let fx = Fixture::new();
        let ctx = fx.signed_in("pa@example.com", Role::Admin, None).await;
        fx.partner(10, Some(ctx.principal_id()));
        seed(&fx);

        assert!(service(&fx).reviews(&ctx).await.unwrap().is_empty());
        assert_eq!(fx.backend.operations(REVIEWS_TABLE), 0);
    }

    #[tokio::test]
    async fn super_admin_sees_everything() {
        let fx = Fixture::new();
        let ctx = fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        seed(&fx);

        assert_eq!(service(&fx).consultations(&ctx).await.unwrap().len(), 2);
        assert_eq!(service(&fx).reviews(&ctx).await.unwrap().len(), 1);
    }
}
