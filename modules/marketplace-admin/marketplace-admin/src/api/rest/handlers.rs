use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use console_errors::Problem;
use console_security::{ActivityId, ActivityType, PartnerId, Profile};
use marketplace_admin_sdk::{
    AccessApi, Page, Partner, Subscription, UserConsumption, UserUpdate, VoyanceConsultation,
    VoyanceReview,
};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::rest::auth::{Session, extract_bearer_token};
use crate::api::rest::dto::{
    ActivityAccessDto, DeletedDto, SessionDto, SignInRequest, SignInResponse, SignUpRequest,
    SignUpResponse, UploadQuery, UploadResponse,
};
use crate::api::rest::error::ApiResult;
use crate::config::ConsoleConfig;
use crate::domain::access::AccessResolver;
use crate::domain::billing::BillingService;
use crate::domain::error::DomainError;
use crate::domain::forms::FormValues;
use crate::domain::listing::{ListQuery, paginate};
use crate::domain::navigation::{NavItem, sidebar};
use crate::domain::partners::PartnerService;
use crate::domain::session::SessionGate;
use crate::domain::uploads::{ImageUploads, UploadTarget};
use crate::domain::users::UserService;
use crate::domain::verticals::VerticalRegistry;
use crate::domain::voyance::VoyanceService;

type JsonPage<T> = ApiResult<Json<Page<T>>>;

/// Page of a successfully loaded list, or an empty page with a notice when
/// the backend read failed. Other errors (authorization) are returned as is.
fn listed<T: Serialize>(
    loaded: Result<Vec<T>, DomainError>,
    query: &ListQuery,
    page_size: usize,
) -> JsonPage<T> {
    match loaded {
        Ok(items) => Ok(Json(paginate(items, query, page_size))),
        Err(e) => match e.failed_operation() {
            Some(operation) => {
                tracing::error!(error = %e, "list load failed, serving empty page");
                Ok(Json(
                    Page::empty(page_size).with_notice(format!("failed to {operation}")),
                ))
            }
            None => Err(e.into()),
        },
    }
}

fn activity_type(raw: &str) -> Result<ActivityType, Problem> {
    raw.parse()
        .map_err(|_| DomainError::NotFound(format!("activity type {raw:?}")).into())
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// --- auth -----------------------------------------------------------------

pub async fn sign_in(
    Extension(gate): Extension<Arc<SessionGate>>,
    Extension(access): Extension<Arc<AccessResolver>>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SignInResponse>> {
    let (auth, ctx) = gate.sign_in(&req.email, &req.password).await?;
    let snapshot = access.snapshot(&ctx).await;
    Ok(Json(SignInResponse::new(
        &auth,
        SessionDto::new(&ctx, &snapshot),
    )))
}

pub async fn sign_up(
    Extension(gate): Extension<Arc<SessionGate>>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    let metadata = req.metadata.unwrap_or_else(|| json!({}));
    let user = gate.sign_up(&req.email, &req.password, metadata).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: user.id,
            email: user.email,
        }),
    ))
}

pub async fn sign_out(
    Extension(gate): Extension<Arc<SessionGate>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| DomainError::Unauthenticated("missing bearer token".to_owned()))?;
    gate.sign_out(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- session --------------------------------------------------------------

pub async fn get_session(
    Session(ctx): Session,
    Extension(access): Extension<Arc<AccessResolver>>,
) -> Json<SessionDto> {
    let snapshot = access.snapshot(&ctx).await;
    Json(SessionDto::new(&ctx, &snapshot))
}

pub async fn get_navigation(
    Session(ctx): Session,
    Extension(access): Extension<Arc<AccessResolver>>,
) -> Json<Vec<NavItem>> {
    Json(sidebar(&*access, &ctx).await)
}

// --- partners -------------------------------------------------------------

pub async fn list_partners(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<PartnerService>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Query(query): Query<ListQuery>,
) -> JsonPage<Partner> {
    listed(svc.list(&ctx).await, &query, cfg.page_size)
}

pub async fn save_partner(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<PartnerService>>,
    Json(form): Json<FormValues>,
) -> ApiResult<Json<Partner>> {
    Ok(Json(svc.save(&ctx, form).await?))
}

pub async fn delete_partner(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<PartnerService>>,
    Path(id): Path<PartnerId>,
) -> ApiResult<Json<DeletedDto>> {
    let deleted = svc.delete(&ctx, id).await?;
    Ok(Json(DeletedDto { deleted }))
}

// --- activities -----------------------------------------------------------

pub async fn list_activities(
    Session(ctx): Session,
    Extension(registry): Extension<Arc<VerticalRegistry>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> JsonPage<Value> {
    let service = registry.get(activity_type(&kind)?)?;
    listed(service.list(&ctx).await, &query, cfg.page_size)
}

pub async fn save_activity(
    Session(ctx): Session,
    Extension(registry): Extension<Arc<VerticalRegistry>>,
    Path(kind): Path<String>,
    Json(form): Json<FormValues>,
) -> ApiResult<Json<Value>> {
    let service = registry.get(activity_type(&kind)?)?;
    Ok(Json(service.save(&ctx, form).await?))
}

pub async fn delete_activity(
    Session(ctx): Session,
    Extension(registry): Extension<Arc<VerticalRegistry>>,
    Path((kind, id)): Path<(String, ActivityId)>,
) -> ApiResult<Json<DeletedDto>> {
    let service = registry.get(activity_type(&kind)?)?;
    let deleted = service.delete(&ctx, id).await?;
    Ok(Json(DeletedDto { deleted }))
}

pub async fn activity_access(
    Session(ctx): Session,
    Extension(access): Extension<Arc<AccessResolver>>,
    Path((kind, id)): Path<(String, ActivityId)>,
) -> ApiResult<Json<ActivityAccessDto>> {
    let activity_type = activity_type(&kind)?;
    let can_access = access.can_access_activity(&ctx, activity_type, id).await;
    Ok(Json(ActivityAccessDto {
        activity_type,
        id,
        can_access,
    }))
}

// --- voyance / billing ----------------------------------------------------

pub async fn list_consultations(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<VoyanceService>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Query(query): Query<ListQuery>,
) -> JsonPage<VoyanceConsultation> {
    listed(svc.consultations(&ctx).await, &query, cfg.page_size)
}

pub async fn list_reviews(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<VoyanceService>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Query(query): Query<ListQuery>,
) -> JsonPage<VoyanceReview> {
    listed(svc.reviews(&ctx).await, &query, cfg.page_size)
}

pub async fn list_subscriptions(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<BillingService>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Query(query): Query<ListQuery>,
) -> JsonPage<Subscription> {
    listed(svc.subscriptions(&ctx).await, &query, cfg.page_size)
}

pub async fn list_consumption(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<BillingService>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Query(query): Query<ListQuery>,
) -> JsonPage<UserConsumption> {
    listed(svc.consumption(&ctx).await, &query, cfg.page_size)
}

// --- users ----------------------------------------------------------------

pub async fn list_users(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<UserService>>,
    Extension(cfg): Extension<Arc<ConsoleConfig>>,
    Query(query): Query<ListQuery>,
) -> JsonPage<Profile> {
    listed(svc.list(&ctx).await, &query, cfg.page_size)
}

pub async fn update_user(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<UserService>>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(svc.update(&ctx, id, update).await?))
}

pub async fn delete_user(
    Session(ctx): Session,
    Extension(svc): Extension<Arc<UserService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeletedDto>> {
    let deleted = svc.delete(&ctx, id).await?;
    Ok(Json(DeletedDto { deleted }))
}

// --- uploads --------------------------------------------------------------

pub async fn upload_image(
    Session(ctx): Session,
    Extension(uploads): Extension<Arc<ImageUploads>>,
    Path(target): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let target: UploadTarget = target.parse()?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let file_name = query.file_name.as_deref().unwrap_or("upload");

    let url = uploads
        .upload(&ctx, target, file_name, content_type, body)
        .await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}
