use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of `subscriptions`. Read-only from the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row of `user_consumption`. Read-only from the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConsumption {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub consumed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
