use chrono::{DateTime, Utc};
use console_security::PartnerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Record;

/// Business account owning activity rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PartnerId>,
    pub business_name: String,
    pub business_type: String,
    /// Owning profile. `None` for partners managed by super admins only.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Partner {
    const TABLE: &'static str = "partners";
    const LABEL: &'static str = "partner";
    const REQUIRED: &'static [&'static str] = &["business_name", "business_type"];

    fn id(&self) -> Option<i64> {
        self.id
    }
}
