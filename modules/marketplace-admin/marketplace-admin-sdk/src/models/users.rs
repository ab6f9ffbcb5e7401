use console_security::{AdminType, Role};
use serde::{Deserialize, Deserializer, Serialize};

/// Changes a super admin may apply to a profile.
///
/// `admin_type` distinguishes "leave unchanged" (absent) from "clear"
/// (`null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub admin_type: Option<Option<AdminType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.admin_type.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
