use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Router, middleware};

use crate::api::rest::{auth, handlers};
use crate::module::MarketplaceAdminModule;

/// Room for headers and multipart-free framing on top of the image itself.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

/// Mount the console routes on `router`.
///
/// `/health` and `/auth/v1/*` are public; everything under `/console/v1`
/// runs behind [`auth::require_session`].
pub fn register_routes(router: Router, module: &MarketplaceAdminModule) -> Router {
    let protected = Router::new()
        .route("/console/v1/session", get(handlers::get_session))
        .route("/console/v1/navigation", get(handlers::get_navigation))
        .route(
            "/console/v1/partners",
            get(handlers::list_partners).post(handlers::save_partner),
        )
        .route("/console/v1/partners/{id}", delete(handlers::delete_partner))
        .route(
            "/console/v1/activities/{kind}",
            get(handlers::list_activities).post(handlers::save_activity),
        )
        .route(
            "/console/v1/activities/{kind}/{id}",
            delete(handlers::delete_activity),
        )
        .route(
            "/console/v1/activities/{kind}/{id}/access",
            get(handlers::activity_access),
        )
        .route(
            "/console/v1/voyance/consultations",
            get(handlers::list_consultations),
        )
        .route("/console/v1/voyance/reviews", get(handlers::list_reviews))
        .route("/console/v1/subscriptions", get(handlers::list_subscriptions))
        .route("/console/v1/consumption", get(handlers::list_consumption))
        .route("/console/v1/users", get(handlers::list_users))
        .route(
            "/console/v1/users/{id}",
            patch(handlers::update_user).delete(handlers::delete_user),
        )
        .route(
            "/console/v1/uploads/{target}",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(
                module.uploads.max_upload_bytes() + UPLOAD_BODY_SLACK,
            )),
        )
        .route_layer(middleware::from_fn_with_state(
            module.gate.clone(),
            auth::require_session,
        ));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/v1/sign-in", post(handlers::sign_in))
        .route("/auth/v1/sign-up", post(handlers::sign_up))
        .route("/auth/v1/sign-out", post(handlers::sign_out));

    router
        .merge(public)
        .merge(protected)
        .layer(Extension(module.config.clone()))
        .layer(Extension(module.gate.clone()))
        .layer(Extension(module.access.clone()))
        .layer(Extension(module.verticals.clone()))
        .layer(Extension(module.partners.clone()))
        .layer(Extension(module.users.clone()))
        .layer(Extension(module.voyance.clone()))
        .layer(Extension(module.billing.clone()))
        .layer(Extension(module.uploads.clone()))
}
