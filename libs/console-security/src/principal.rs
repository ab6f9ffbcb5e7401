use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Application role stored on the `profiles` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Editor,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refines the `admin` role: unrestricted or restricted to owned partners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminType {
    SuperAdmin,
    PartnerAdmin,
}

/// Authenticated identity of a backend auth session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    #[must_use]
    pub fn new(id: Uuid, email: Option<String>) -> Self {
        Self { id, email }
    }
}

/// Application-level record associated one-to-one with a principal.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub admin_type: Option<AdminType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A freshly provisioned profile for `principal` carrying `role`.
    #[must_use]
    pub fn provisioned(principal: &Principal, role: Role) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            first_name: None,
            last_name: None,
            role,
            admin_type: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.is_admin() && self.admin_type == Some(AdminType::SuperAdmin)
    }

    #[must_use]
    pub fn can_access_all_data(&self) -> bool {
        self.is_super_admin()
    }

    /// Fields whose change invalidates derived access state.
    #[must_use]
    pub fn fingerprint(&self) -> ProfileFingerprint {
        ProfileFingerprint {
            role: self.role,
            admin_type: self.admin_type,
            updated_at: self.updated_at,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.email.clone().unwrap_or_else(|| self.id.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileFingerprint {
    role: Role,
    admin_type: Option<AdminType>,
    updated_at: Option<DateTime<Utc>>,
}
