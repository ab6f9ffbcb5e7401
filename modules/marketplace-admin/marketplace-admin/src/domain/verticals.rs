//! Per-vertical data services.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use backend_sdk::{Direction, Query, RowStore};
use console_security::{ActivityId, ActivityType, PartnerId, SessionContext};
use marketplace_admin_sdk::{
    AccessApi, Accommodation, ActivityRecord, BonPlan, CarModel, Concert, Loisir, NightlifeEvent,
    Promotion, Record, Restaurant, TravelOffer, VoyanceMedium,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::access::AccessResolver;
use crate::domain::error::DomainError;
use crate::domain::forms::{FormValues, prepare, prepare_patch, targets_existing_row};
use crate::domain::rows::{decode_row, decode_rows, encode_row};

/// Data service of one activity table.
///
/// Reads are filtered to the caller's partners. Writes are guarded by the
/// access resolver before reaching the backend, which applies its own
/// row-level policies on top.
pub struct VerticalService<R> {
    rows: Arc<dyn RowStore>,
    access: Arc<AccessResolver>,
    _record: PhantomData<fn() -> R>,
}

impl<R: ActivityRecord> VerticalService<R> {
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>, access: Arc<AccessResolver>) -> Self {
        Self {
            rows,
            access,
            _record: PhantomData,
        }
    }

    /// Rows visible to the caller, newest first.
    ///
    /// Returns an empty list without querying the table when the caller
    /// owns no partner.
    #[instrument(skip_all, fields(table = R::TABLE, principal_id = %ctx.principal_id()))]
    pub async fn fetch(&self, ctx: &SessionContext) -> Result<Vec<R>, DomainError> {
        let mut query = Query::table(R::TABLE)
            .order("created_at", Direction::Desc)
            .bearer(ctx.access_token());

        if !ctx.can_access_all_data() {
            let snapshot = self.access.snapshot(ctx).await;
            if snapshot.scope.is_empty() {
                debug!("no accessible partner, skipping query");
                return Ok(Vec::new());
            }
            query = query.in_list(
                ActivityType::PARTNER_COLUMN,
                snapshot.scope.partner_ids().to_vec(),
            );
        }

        let rows = self
            .rows
            .select(&query)
            .await
            .map_err(|e| DomainError::backend(format!("load {} list", R::LABEL), e))?;
        decode_rows(rows, R::LABEL)
    }

    /// Insert the form as a new row, or update the row named by its `id`.
    ///
    /// An update only writes the submitted fields; everything else, the
    /// owning partner included, keeps its stored value.
    #[instrument(skip_all, fields(table = R::TABLE, principal_id = %ctx.principal_id()))]
    pub async fn save(&self, ctx: &SessionContext, form: FormValues) -> Result<R, DomainError> {
        let saved = if targets_existing_row(&form) {
            self.update(ctx, prepare_patch::<R>(form)?).await?
        } else {
            self.insert(ctx, prepare::<R>(form)?).await?
        };

        // Visibility of the type may have changed for the owning partner admin.
        self.access.invalidate_all();
        info!(id = ?saved.id(), partner_id = ?saved.partner_id(), "saved");
        Ok(saved)
    }

    async fn insert(&self, ctx: &SessionContext, mut values: FormValues) -> Result<R, DomainError> {
        let partner_id = self.resolve_partner(ctx, &values).await?;
        values.insert(
            ActivityType::PARTNER_COLUMN.to_owned(),
            partner_id.map_or(Value::Null, Value::from),
        );

        let record: R = serde_json::from_value(Value::Object(values))
            .map_err(|e| DomainError::validation("form", e.to_string()))?;
        let row = self
            .rows
            .insert(
                &Query::table(R::TABLE).bearer(ctx.access_token()),
                encode_row(&record)?,
            )
            .await
            .map_err(|e| DomainError::backend(format!("save {}", R::LABEL), e))?;
        decode_row(row, R::LABEL)
    }

    async fn update(&self, ctx: &SessionContext, mut patch: FormValues) -> Result<R, DomainError> {
        let id = patch
            .remove("id")
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| DomainError::validation("id", "must be an integer"))?;
        if !self.access.can_access_activity(ctx, R::TYPE, id).await {
            return Err(DomainError::Forbidden(format!(
                "{} {id} is not accessible",
                R::LABEL
            )));
        }
        if patch.contains_key(ActivityType::PARTNER_COLUMN) {
            self.check_reassignment(ctx, requested_partner(&patch)?).await?;
        }
        if patch.is_empty() {
            return Err(DomainError::validation("form", "has no field to update"));
        }

        let updated = self
            .rows
            .update(
                &Query::table(R::TABLE)
                    .eq("id", id)
                    .bearer(ctx.access_token()),
                patch,
            )
            .await
            .map_err(|e| DomainError::backend(format!("save {}", R::LABEL), e))?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::NotFound(format!("{} {id}", R::LABEL)))?;
        decode_row(row, R::LABEL)
    }

    /// Delete one row. Returns whether a row was removed.
    #[instrument(skip(self, ctx), fields(table = R::TABLE, principal_id = %ctx.principal_id()))]
    pub async fn delete(&self, ctx: &SessionContext, id: ActivityId) -> Result<bool, DomainError> {
        if !self.access.can_access_activity(ctx, R::TYPE, id).await {
            return Err(DomainError::Forbidden(format!(
                "{} {id} is not accessible",
                R::LABEL
            )));
        }
        let removed = self
            .rows
            .delete(
                &Query::table(R::TABLE)
                    .eq("id", id)
                    .bearer(ctx.access_token()),
            )
            .await
            .map_err(|e| DomainError::backend(format!("delete {}", R::LABEL), e))?;

        if removed > 0 {
            self.access.invalidate_all();
            info!(id, "deleted");
        }
        Ok(removed > 0)
    }

    /// Partner a new row is attached to.
    ///
    /// Partner admins owning exactly one partner get it assigned when the
    /// form leaves it empty; with several the choice is required.
    async fn resolve_partner(
        &self,
        ctx: &SessionContext,
        values: &FormValues,
    ) -> Result<Option<PartnerId>, DomainError> {
        let requested = requested_partner(values)?;
        if ctx.can_access_all_data() {
            return Ok(requested);
        }

        match requested {
            Some(_) => {
                self.check_reassignment(ctx, requested).await?;
                Ok(requested)
            }
            None => match self.access.partner_ids(ctx).await.as_slice() {
                [only] => Ok(Some(*only)),
                [] => Err(DomainError::Forbidden(
                    "no partner is attached to this account".to_owned(),
                )),
                _ => Err(DomainError::validation(
                    "partner_id",
                    "is required when managing several partners",
                )),
            },
        }
    }

    /// A partner admin may only attach rows to partners it owns, and never
    /// detach them.
    async fn check_reassignment(
        &self,
        ctx: &SessionContext,
        partner_id: Option<PartnerId>,
    ) -> Result<(), DomainError> {
        if ctx.can_access_all_data() {
            return Ok(());
        }
        match partner_id {
            Some(id) if self.access.can_access_partner(ctx, id).await => Ok(()),
            Some(id) => Err(DomainError::Forbidden(format!(
                "partner {id} is not accessible"
            ))),
            None => Err(DomainError::Forbidden(
                "rows cannot be detached from their partner".to_owned(),
            )),
        }
    }
}

fn requested_partner(values: &FormValues) -> Result<Option<PartnerId>, DomainError> {
    match values.get(ActivityType::PARTNER_COLUMN) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| DomainError::validation("partner_id", "must be an integer")),
    }
}

/// Type-erased view of a [`VerticalService`], used by the REST layer to
/// address any vertical by its [`ActivityType`].
#[async_trait]
pub trait VerticalApi: Send + Sync {
    fn activity_type(&self) -> ActivityType;

    async fn list(&self, ctx: &SessionContext) -> Result<Vec<Value>, DomainError>;

    async fn save(&self, ctx: &SessionContext, form: FormValues) -> Result<Value, DomainError>;

    async fn delete(&self, ctx: &SessionContext, id: ActivityId) -> Result<bool, DomainError>;
}

#[async_trait]
impl<R: ActivityRecord> VerticalApi for VerticalService<R> {
    fn activity_type(&self) -> ActivityType {
        R::TYPE
    }

    async fn list(&self, ctx: &SessionContext) -> Result<Vec<Value>, DomainError> {
        self.fetch(ctx).await?.iter().map(to_json).collect()
    }

    async fn save(&self, ctx: &SessionContext, form: FormValues) -> Result<Value, DomainError> {
        to_json(&VerticalService::save(self, ctx, form).await?)
    }

    async fn delete(&self, ctx: &SessionContext, id: ActivityId) -> Result<bool, DomainError> {
        VerticalService::delete(self, ctx, id).await
    }
}

fn to_json<R: Record>(record: &R) -> Result<Value, DomainError> {
    serde_json::to_value(record).map_err(|e| DomainError::validation("record", e.to_string()))
}

/// One service per registered [`ActivityType`].
pub struct VerticalRegistry {
    services: BTreeMap<ActivityType, Arc<dyn VerticalApi>>,
}

impl VerticalRegistry {
    #[must_use]
    pub fn new(rows: &Arc<dyn RowStore>, access: &Arc<AccessResolver>) -> Self {
        fn service<R: ActivityRecord>(
            rows: &Arc<dyn RowStore>,
            access: &Arc<AccessResolver>,
        ) -> Arc<dyn VerticalApi> {
            Arc::new(VerticalService::<R>::new(rows.clone(), access.clone()))
        }

        let services = [
            service::<Restaurant>(rows, access),
            service::<Accommodation>(rows, access),
            service::<Concert>(rows, access),
            service::<NightlifeEvent>(rows, access),
            service::<Loisir>(rows, access),
            service::<CarModel>(rows, access),
            service::<TravelOffer>(rows, access),
            service::<Promotion>(rows, access),
            service::<BonPlan>(rows, access),
            service::<VoyanceMedium>(rows, access),
        ]
        .into_iter()
        .map(|svc| (svc.activity_type(), svc))
        .collect();

        Self { services }
    }

    /// # Errors
    /// `NotFound` if no service is registered for `activity_type`.
    pub fn get(&self, activity_type: ActivityType) -> Result<&Arc<dyn VerticalApi>, DomainError> {
        self.services
            .get(&activity_type)
            .ok_or_else(|| DomainError::NotFound(format!("vertical {activity_type}")))
    }

    pub fn activity_types(&self) -> impl Iterator<Item = ActivityType> + '_ {
        self.services.keys().copied()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::test_support::{Fixture, object, valid_form};
    use backend_sdk::BackendError;
    use console_security::{AdminType, Role};
    use memory_backend_plugin::OpKind;
    use serde_json::json;

    struct Env {
        fx: Fixture,
        access: Arc<AccessResolver>,
        registry: VerticalRegistry,
    }

    fn env() -> Env {
        let fx = Fixture::new();
        let rows = fx.backend_handle().rows;
        let access = Arc::new(AccessResolver::new(rows.clone()));
        let registry = VerticalRegistry::new(&rows, &access);
        Env {
            fx,
            access,
            registry,
        }
    }

    fn restaurants(env: &Env) -> VerticalService<Restaurant> {
        VerticalService::new(env.fx.backend_handle().rows, env.access.clone())
    }

    #[test]
    fn every_activity_type_is_registered() {
        let env = env();
        assert!(env.registry.activity_types().eq(ActivityType::ALL));
    }

    #[tokio::test]
    async fn zero_partners_fetches_nothing_without_row_queries() {
        let env = env();
        env.fx.activity(ActivityType::Restaurant, 1, Some(10));
        let ctx = env
            .fx
            .signed_in("pa@example.com", Role::Admin, Some(AdminType::PartnerAdmin))
            .await;

        for t in ActivityType::ALL {
            let list = env.registry.get(t).unwrap().list(&ctx).await.unwrap();
            assert!(list.is_empty());
            assert_eq!(env.fx.backend.operations(t.table()), 0, "{t} was queried");
        }
    }

    #[tokio::test]
    async fn fetch_filters_by_owned_partners() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));
        env.fx.activity(ActivityType::Restaurant, 1, Some(10));
        env.fx.activity(ActivityType::Restaurant, 2, Some(11));
        env.fx.activity(ActivityType::Restaurant, 3, None);

        let rows = restaurants(&env).fetch(&ctx).await.unwrap();
        let ids: Vec<_> = rows.iter().filter_map(Record::id).collect();
        assert_eq!(ids, [1]);
    }

    #[tokio::test]
    async fn super_admin_fetches_everything_newest_first() {
        let env = env();
        let ctx = env
            .fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        let svc = restaurants(&env);
        for name in ["first", "second"] {
            let mut form = valid_form(ActivityType::Restaurant);
            form.insert("name".into(), json!(name));
            svc.save(&ctx, form).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let rows = svc.fetch(&ctx).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[tokio::test]
    async fn single_partner_is_assigned_when_form_omits_it() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));

        let saved = restaurants(&env)
            .save(&ctx, valid_form(ActivityType::Restaurant))
            .await
            .unwrap();
        assert_eq!(saved.partner_id, Some(10));
        assert!(saved.id.is_some());
    }

    #[tokio::test]
    async fn several_partners_require_an_explicit_choice() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));
        env.fx.partner(12, Some(ctx.principal_id()));

        let err = restaurants(&env)
            .save(&ctx, valid_form(ActivityType::Restaurant))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(v) if v[0].field == "partner_id"));
    }

    #[tokio::test]
    async fn foreign_partner_and_foreign_row_are_rejected_before_writing() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));
        env.fx.activity(ActivityType::Restaurant, 15, Some(11));

        let mut form = valid_form(ActivityType::Restaurant);
        form.insert("partner_id".into(), json!("11"));
        assert!(matches!(
            restaurants(&env).save(&ctx, form).await,
            Err(DomainError::Forbidden(_))
        ));

        let mut form = valid_form(ActivityType::Restaurant);
        form.insert("id".into(), json!(15));
        assert!(matches!(
            restaurants(&env).save(&ctx, form).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            restaurants(&env).delete(&ctx, 15).await,
            Err(DomainError::Forbidden(_))
        ));

        assert_eq!(env.fx.backend.operations_of("restaurants", OpKind::Insert), 0);
        assert_eq!(env.fx.backend.operations_of("restaurants", OpKind::Update), 0);
        assert_eq!(env.fx.backend.operations_of("restaurants", OpKind::Delete), 0);
    }

    #[tokio::test]
    async fn update_and_delete_owned_row() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));
        env.fx.activity(ActivityType::Restaurant, 15, Some(10));
        let svc = restaurants(&env);

        let mut form = valid_form(ActivityType::Restaurant);
        form.insert("id".into(), json!("15"));
        form.insert("name".into(), json!("Renamed"));
        let saved = svc.save(&ctx, form).await.unwrap();
        assert_eq!(saved.name, "Renamed");
        assert_eq!(saved.partner_id, Some(10));

        assert!(svc.delete(&ctx, 15).await.unwrap());
        assert!(env.fx.backend.rows("restaurants").is_empty());
    }

    fn seed_detailed_restaurant(env: &Env) {
        env.fx.backend.seed_rows(
            "restaurants",
            [object(json!({
                "id": 15, "partner_id": 10, "name": "Chez Lou", "city": "Nice",
                "phone": "0590", "description": "great", "is_active": false,
            }))],
        );
    }

    #[tokio::test]
    async fn partial_update_keeps_omitted_columns() {
        let env = env();
        let ctx = env
            .fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        seed_detailed_restaurant(&env);

        let saved = restaurants(&env)
            .save(&ctx, object(json!({"id": "15", "name": "Renamed", "city": "Paris"})))
            .await
            .unwrap();
        assert_eq!(saved.name, "Renamed");
        assert_eq!(saved.city, "Paris");
        assert_eq!(saved.partner_id, Some(10));
        assert_eq!(saved.phone.as_deref(), Some("0590"));
        assert_eq!(saved.description.as_deref(), Some("great"));
        assert!(!saved.is_active);

        let stored = &env.fx.backend.rows("restaurants")[0];
        assert_eq!(stored["partner_id"], json!(10));
        assert_eq!(stored["phone"], json!("0590"));
        assert_eq!(stored["is_active"], json!(false));
    }

    #[tokio::test]
    async fn owner_of_several_partners_updates_without_naming_one() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));
        env.fx.partner(12, Some(ctx.principal_id()));
        env.fx.activity(ActivityType::Restaurant, 15, Some(12));

        let saved = restaurants(&env)
            .save(&ctx, object(json!({"id": "15", "name": "Renamed", "city": "Paris"})))
            .await
            .unwrap();
        assert_eq!(saved.name, "Renamed");
        assert_eq!(saved.partner_id, Some(12));
    }

    #[tokio::test]
    async fn partner_admin_moves_rows_only_between_owned_partners() {
        let env = env();
        let ctx = env.fx.signed_in("pa@example.com", Role::Admin, None).await;
        env.fx.partner(10, Some(ctx.principal_id()));
        env.fx.partner(12, Some(ctx.principal_id()));
        env.fx.activity(ActivityType::Restaurant, 15, Some(12));
        let svc = restaurants(&env);

        for partner in [json!(11), Value::Null] {
            let err = svc
                .save(&ctx, object(json!({"id": 15, "partner_id": partner})))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Forbidden(_)), "{partner}");
        }
        assert_eq!(env.fx.backend.operations_of("restaurants", OpKind::Update), 0);

        let saved = svc
            .save(&ctx, object(json!({"id": 15, "partner_id": "10"})))
            .await
            .unwrap();
        assert_eq!(saved.partner_id, Some(10));
    }

    #[tokio::test]
    async fn update_rejects_blanked_required_field_and_empty_patch() {
        let env = env();
        let ctx = env
            .fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        seed_detailed_restaurant(&env);
        let svc = restaurants(&env);

        let err = svc
            .save(&ctx, object(json!({"id": 15, "city": " "})))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(v) if v[0].field == "city"));

        let err = svc.save(&ctx, object(json!({"id": 15}))).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(env.fx.backend.operations_of("restaurants", OpKind::Update), 0);
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_backend() {
        let env = env();
        let ctx = env
            .fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;

        let err = restaurants(&env)
            .save(&ctx, object(json!({"name": "No city"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(env.fx.backend.operations("restaurants"), 0);
    }

    #[tokio::test]
    async fn write_failure_names_the_operation() {
        let env = env();
        let ctx = env
            .fx
            .signed_in("root@example.com", Role::Admin, Some(AdminType::SuperAdmin))
            .await;
        env.fx.backend.fail_on(
            "concerts",
            BackendError::Http {
                status: 500,
                message: "boom".into(),
            },
        );

        let err = env
            .registry
            .get(ActivityType::Concert)
            .unwrap()
            .save(&ctx, valid_form(ActivityType::Concert))
            .await
            .unwrap_err();
        assert_eq!(err.failed_operation(), Some("save concert"));
    }
}
