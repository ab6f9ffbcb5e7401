//! Partner-scoped access-control resolver.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use backend_sdk::{AuthEvent, AuthStateChange, Query, RowStore};
use console_security::{
    ActivityId, ActivityType, PartnerId, PartnerScope, ProfileFingerprint, SessionContext,
};
use futures::future::join_all;
use marketplace_admin_sdk::AccessApi;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::domain::rows::cell_i64;

pub const PARTNERS_TABLE: &str = "partners";

/// Derived access state of one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSnapshot {
    pub scope: PartnerScope,
    /// Activity types with at least one row owned by a partner in `scope`.
    pub visible_types: BTreeSet<ActivityType>,
    /// False when a backend query failed while building the snapshot. Such
    /// snapshots are served but never cached.
    pub complete: bool,
}

impl AccessSnapshot {
    fn empty() -> Self {
        Self {
            scope: PartnerScope::deny_all(),
            visible_types: BTreeSet::new(),
            complete: true,
        }
    }
}

struct CacheEntry {
    fingerprint: ProfileFingerprint,
    snapshot: Arc<AccessSnapshot>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Uuid, CacheEntry>,
    /// Bumped by `invalidate(principal)`.
    generations: HashMap<Uuid, u64>,
    /// Bumped by `invalidate_all()`.
    epoch: u64,
}

impl CacheState {
    fn stamp(&self, principal: Uuid) -> (u64, u64) {
        (
            self.epoch,
            self.generations.get(&principal).copied().unwrap_or_default(),
        )
    }
}

/// Resolves which partners and activity types a principal may reach.
///
/// Results are cached per principal and keyed by the profile fingerprint, so
/// a role change is picked up on the next request. A computation that raced
/// with an invalidation, or whose cancellation token fired, is returned to its
/// caller but not committed.
pub struct AccessResolver {
    rows: Arc<dyn RowStore>,
    cache: RwLock<CacheState>,
}

impl AccessResolver {
    #[must_use]
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self {
            rows,
            cache: RwLock::new(CacheState::default()),
        }
    }

    pub async fn snapshot(&self, ctx: &SessionContext) -> Arc<AccessSnapshot> {
        self.snapshot_with_cancel(ctx, &CancellationToken::new())
            .await
    }

    #[instrument(skip_all, fields(principal_id = %ctx.principal_id()))]
    pub async fn snapshot_with_cancel(
        &self,
        ctx: &SessionContext,
        cancel: &CancellationToken,
    ) -> Arc<AccessSnapshot> {
        let principal = ctx.principal_id();
        let fingerprint = ctx.profile().fingerprint();

        let stamp = {
            let cache = self.cache.read();
            if let Some(entry) = cache.entries.get(&principal)
                && entry.fingerprint == fingerprint
            {
                return entry.snapshot.clone();
            }
            cache.stamp(principal)
        };

        let snapshot = Arc::new(self.compute(ctx).await);

        if !snapshot.complete || cancel.is_cancelled() {
            return snapshot;
        }
        let mut cache = self.cache.write();
        if cache.stamp(principal) == stamp {
            cache.entries.insert(
                principal,
                CacheEntry {
                    fingerprint,
                    snapshot: snapshot.clone(),
                },
            );
        } else {
            debug!("access snapshot invalidated while computing, not cached");
        }
        snapshot
    }

    /// Drop the cached state of one principal.
    pub fn invalidate(&self, principal: Uuid) {
        let mut cache = self.cache.write();
        cache.entries.remove(&principal);
        *cache.generations.entry(principal).or_default() += 1;
    }

    /// Drop every cached state, e.g. after a partner or activity write.
    pub fn invalidate_all(&self) {
        let mut cache = self.cache.write();
        cache.entries.clear();
        cache.epoch += 1;
    }

    /// Invalidate cached state on sign-out and profile updates until
    /// `cancel` fires or the stream closes.
    pub async fn watch_auth_events(
        &self,
        mut events: broadcast::Receiver<AuthStateChange>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(change) => self.on_auth_change(&change),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "auth events lagged, dropping every cached access state");
                        self.invalidate_all();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    fn on_auth_change(&self, change: &AuthStateChange) {
        match change.event {
            AuthEvent::SignedOut | AuthEvent::UserUpdated => {
                if let Some(user_id) = change.user_id {
                    debug!(%user_id, event = ?change.event, "invalidating access state");
                    self.invalidate(user_id);
                }
            }
            AuthEvent::SignedIn | AuthEvent::TokenRefreshed => {}
        }
    }

    async fn compute(&self, ctx: &SessionContext) -> AccessSnapshot {
        if !ctx.profile().is_admin() {
            return AccessSnapshot::empty();
        }

        if ctx.can_access_all_data() {
            let (ids, complete) = match self.select_partner_ids(ctx, None).await {
                Some(ids) => (ids, true),
                None => (Vec::new(), false),
            };
            return AccessSnapshot {
                scope: PartnerScope::unrestricted(ids),
                visible_types: ActivityType::ALL.into_iter().collect(),
                complete,
            };
        }

        let Some(owned) = self
            .select_partner_ids(ctx, Some(ctx.principal_id()))
            .await
        else {
            return AccessSnapshot {
                complete: false,
                ..AccessSnapshot::empty()
            };
        };
        if owned.is_empty() {
            debug!("principal owns no partner");
            return AccessSnapshot::empty();
        }

        let scope = PartnerScope::partners(owned);
        let (visible_types, complete) = self.visibility_index(ctx, &scope).await;
        AccessSnapshot {
            scope,
            visible_types,
            complete,
        }
    }

    async fn select_partner_ids(
        &self,
        ctx: &SessionContext,
        owner: Option<Uuid>,
    ) -> Option<Vec<PartnerId>> {
        let mut query = Query::table(PARTNERS_TABLE)
            .select("id")
            .bearer(ctx.access_token());
        if let Some(owner) = owner {
            query = query.eq("user_id", owner.to_string());
        }
        match self.rows.select(&query).await {
            Ok(rows) => Some(rows.iter().filter_map(|r| cell_i64(r, "id")).collect()),
            Err(e) => {
                error!(error = %e, "failed to load partner ids");
                None
            }
        }
    }

    /// One count query per activity type, run concurrently. A failed count
    /// hides that type only.
    async fn visibility_index(
        &self,
        ctx: &SessionContext,
        scope: &PartnerScope,
    ) -> (BTreeSet<ActivityType>, bool) {
        let counts = ActivityType::ALL.map(|activity_type| {
            let query = Query::table(activity_type.table())
                .in_list(ActivityType::PARTNER_COLUMN, scope.partner_ids().to_vec())
                .bearer(ctx.access_token());
            async move { (activity_type, self.rows.count(&query).await) }
        });

        let mut visible = BTreeSet::new();
        let mut complete = true;
        for (activity_type, result) in join_all(counts).await {
            match result {
                Ok(n) if n > 0 => {
                    visible.insert(activity_type);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(%activity_type, error = %e, "visibility count failed, hiding type");
                    complete = false;
                }
            }
        }
        (visible, complete)
    }
}

#[async_trait]
impl AccessApi for AccessResolver {
    async fn partner_ids(&self, ctx: &SessionContext) -> Vec<PartnerId> {
        self.snapshot(ctx).await.scope.partner_ids().to_vec()
    }

    async fn can_access_partner(&self, ctx: &SessionContext, partner_id: PartnerId) -> bool {
        if ctx.can_access_all_data() {
            return true;
        }
        self.snapshot(ctx).await.scope.contains(partner_id)
    }

    async fn has_access_to_activity_type(
        &self,
        ctx: &SessionContext,
        activity_type: ActivityType,
    ) -> bool {
        if ctx.can_access_all_data() {
            return true;
        }
        self.snapshot(ctx)
            .await
            .visible_types
            .contains(&activity_type)
    }

    #[instrument(skip(self, ctx), fields(principal_id = %ctx.principal_id()))]
    async fn can_access_activity(
        &self,
        ctx: &SessionContext,
        activity_type: ActivityType,
        id: ActivityId,
    ) -> bool {
        if ctx.can_access_all_data() {
            return true;
        }
        let snapshot = self.snapshot(ctx).await;
        if snapshot.scope.is_empty() {
            return false;
        }

        let query = Query::table(activity_type.table())
            .select(ActivityType::PARTNER_COLUMN)
            .eq("id", id)
            .bearer(ctx.access_token());
        match self.rows.select_one(&query).await {
            Ok(Some(row)) => snapshot
                .scope
                .contains_opt(cell_i64(&row, ActivityType::PARTNER_COLUMN)),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to load activity owner, denying");
                false
            }
        }
    }
}
