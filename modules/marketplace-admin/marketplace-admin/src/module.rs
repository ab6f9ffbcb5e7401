use std::sync::Arc;

use axum::Router;
use backend_sdk::Backend;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::rest::routes;
use crate::config::ConsoleConfig;
use crate::domain::access::AccessResolver;
use crate::domain::billing::BillingService;
use crate::domain::partners::PartnerService;
use crate::domain::session::SessionGate;
use crate::domain::session_store::SessionStore;
use crate::domain::uploads::ImageUploads;
use crate::domain::users::UserService;
use crate::domain::verticals::VerticalRegistry;
use crate::domain::voyance::VoyanceService;

/// The console wired onto one backend.
///
/// Services are shared by every request; the only mutable state is the
/// access resolver's cache.
pub struct MarketplaceAdminModule {
    backend: Backend,
    pub(crate) config: Arc<ConsoleConfig>,
    pub(crate) gate: Arc<SessionGate>,
    pub(crate) access: Arc<AccessResolver>,
    pub(crate) verticals: Arc<VerticalRegistry>,
    pub(crate) partners: Arc<PartnerService>,
    pub(crate) users: Arc<UserService>,
    pub(crate) voyance: Arc<VoyanceService>,
    pub(crate) billing: Arc<BillingService>,
    pub(crate) uploads: Arc<ImageUploads>,
}

impl MarketplaceAdminModule {
    #[must_use]
    pub fn new(backend: Backend, config: ConsoleConfig) -> Self {
        info!(
            page_size = config.page_size,
            default_role = %config.provisioning.default_role,
            "initializing marketplace admin module"
        );
        let rows = backend.rows.clone();
        let access = Arc::new(AccessResolver::new(rows.clone()));

        Self {
            gate: Arc::new(SessionGate::new(backend.clone(), &config.provisioning)),
            verticals: Arc::new(VerticalRegistry::new(&rows, &access)),
            partners: Arc::new(PartnerService::new(rows.clone(), access.clone())),
            users: Arc::new(UserService::new(rows.clone(), access.clone())),
            voyance: Arc::new(VoyanceService::new(rows.clone(), access.clone())),
            billing: Arc::new(BillingService::new(rows)),
            uploads: Arc::new(ImageUploads::new(
                backend.storage.clone(),
                access.clone(),
                config.uploads.clone(),
            )),
            access,
            config: Arc::new(config),
            backend,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    #[must_use]
    pub fn access(&self) -> &Arc<AccessResolver> {
        &self.access
    }

    #[must_use]
    pub fn verticals(&self) -> &Arc<VerticalRegistry> {
        &self.verticals
    }

    /// A fresh single-principal session store on the same backend.
    #[must_use]
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.backend.clone(), &self.config.provisioning)
    }

    /// Router serving the console REST API.
    pub fn router(&self) -> Router {
        let router = routes::register_routes(Router::new(), self);
        info!("marketplace admin REST routes registered");
        router
    }

    /// Drop cached access state on sign-out and profile updates until
    /// `cancel` fires.
    pub fn spawn_auth_watcher(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let access = self.access.clone();
        let events = self.backend.auth.subscribe();
        tokio::spawn(async move { access.watch_auth_events(events, cancel).await })
    }
}
