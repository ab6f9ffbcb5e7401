use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Consultation booked with a voyance medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyanceConsultation {
    pub id: i64,
    pub medium_id: i64,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub consultation_type: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Customer review of a voyance medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyanceReview {
    pub id: i64,
    pub medium_id: i64,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
