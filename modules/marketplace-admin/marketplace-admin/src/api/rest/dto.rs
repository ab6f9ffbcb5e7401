use std::collections::BTreeSet;

use backend_sdk::AuthSession;
use console_security::{ActivityId, ActivityType, AdminType, PartnerId, Role, SessionContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::access::AccessSnapshot;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Stored as the user's metadata (e.g. `first_name`, `last_name`).
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub session: SessionDto,
}

impl SignInResponse {
    pub fn new(auth: &AuthSession, session: SessionDto) -> Self {
        Self {
            access_token: auth.access_token.expose().to_owned(),
            refresh_token: auth.refresh_token.as_ref().map(|t| t.expose().to_owned()),
            expires_in: auth.expires_in,
            session,
        }
    }
}

/// The caller's identity, role flags and derived access.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDto {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub display_name: String,
    pub role: Role,
    pub admin_type: Option<AdminType>,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub can_access_all_data: bool,
    pub partner_ids: Vec<PartnerId>,
    pub visible_types: BTreeSet<ActivityType>,
}

impl SessionDto {
    pub fn new(ctx: &SessionContext, access: &AccessSnapshot) -> Self {
        let profile = ctx.profile();
        Self {
            user_id: ctx.principal_id(),
            email: profile.email.clone(),
            display_name: profile.display_name(),
            role: profile.role,
            admin_type: profile.admin_type,
            is_admin: profile.is_admin(),
            is_super_admin: ctx.is_super_admin(),
            can_access_all_data: ctx.can_access_all_data(),
            partner_ids: access.scope.partner_ids().to_vec(),
            visible_types: access.visible_types.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityAccessDto {
    pub activity_type: ActivityType,
    pub id: ActivityId,
    pub can_access: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedDto {
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploadQuery {
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub url: String,
}
