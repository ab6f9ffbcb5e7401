use chrono::{DateTime, Utc};
use console_security::{ActivityId, ActivityType, PartnerId};
use serde::{Deserialize, Serialize};

use crate::activity_record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub city: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    Restaurant, ActivityType::Restaurant,
    required: ["name", "city"],
    numeric: ["rating"],
    boolean: ["is_active"],
    lists: [],
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub name: String,
    /// hotel, guesthouse, villa, ...
    pub accommodation_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub city: String,
    pub price_per_night: f64,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub rooms: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    Accommodation, ActivityType::Accommodation,
    required: ["name", "accommodation_type", "city", "price_per_night"],
    numeric: ["price_per_night", "capacity", "rooms", "rating"],
    boolean: ["is_available"],
    lists: ["amenities"],
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub title: String,
    pub artist: String,
    pub venue: String,
    #[serde(default)]
    pub city: Option<String>,
    pub event_date: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub available_tickets: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    Concert, ActivityType::Concert,
    required: ["title", "artist", "venue", "event_date"],
    numeric: ["price", "available_tickets"],
    boolean: [],
    lists: [],
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightlifeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub title: String,
    pub venue: String,
    #[serde(default)]
    pub event_type: Option<String>,
    pub event_date: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub dress_code: Option<String>,
    #[serde(default)]
    pub min_age: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    NightlifeEvent, ActivityType::Nightlife,
    required: ["title", "venue", "event_date"],
    numeric: ["price", "min_age"],
    boolean: [],
    lists: [],
);

/// Leisure activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loisir {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    Loisir, ActivityType::Loisir,
    required: ["name", "category"],
    numeric: ["price", "duration_minutes"],
    boolean: [],
    lists: [],
);

/// Rental car model offered by a rental company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rental_company: Option<String>,
    #[serde(default)]
    pub seats: Option<i64>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    pub price_per_day: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    CarModel, ActivityType::CarRental,
    required: ["brand", "model", "price_per_day"],
    numeric: ["seats", "price_per_day"],
    boolean: ["is_available"],
    lists: [],
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelOffer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub title: String,
    pub destination: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub return_date: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub included_services: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    TravelOffer, ActivityType::TravelOffer,
    required: ["title", "destination", "price"],
    numeric: ["price", "duration_days"],
    boolean: [],
    lists: ["included_services"],
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_percent: Option<f64>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    Promotion, ActivityType::Promotion,
    required: ["title"],
    numeric: ["discount_percent"],
    boolean: ["is_active"],
    lists: [],
);

/// Limited-time deal ("bon plan").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub discounted_price: Option<f64>,
    #[serde(default)]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    BonPlan, ActivityType::BonPlan,
    required: ["title"],
    numeric: ["original_price", "discounted_price"],
    boolean: [],
    lists: [],
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyanceMedium {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(default)]
    pub partner_id: Option<PartnerId>,
    pub name: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_per_minute: Option<f64>,
    #[serde(default)]
    pub experience_years: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

activity_record!(
    VoyanceMedium, ActivityType::VoyanceMedium,
    required: ["name"],
    numeric: ["price_per_minute", "experience_years", "rating"],
    boolean: ["is_available"],
    lists: ["specialties"],
);

const fn yes() -> bool {
    true
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::record::{ActivityRecord, Record};
    use serde_json::json;

    #[test]
    fn tables_follow_the_activity_registry() {
        assert_eq!(Restaurant::TABLE, "restaurants");
        assert_eq!(NightlifeEvent::TABLE, "nightlife_events");
        assert_eq!(CarModel::TYPE, ActivityType::CarRental);
        assert_eq!(VoyanceMedium::LABEL, "voyance medium");
    }

    #[test]
    fn required_fields_are_known_columns() {
        let r: Restaurant = serde_json::from_value(json!({
            "name": "Chez Lou",
            "city": "Paris"
        }))
        .unwrap();
        let value = serde_json::to_value(&r).unwrap();
        for field in Restaurant::REQUIRED.iter().chain(Restaurant::NUMERIC) {
            assert!(value.get(field).is_some(), "{field} missing");
        }
        assert!(r.is_active);
        assert!(value.get("id").is_none());
    }

    #[test]
    fn partner_id_is_exposed() {
        let m: VoyanceMedium =
            serde_json::from_value(json!({"id": 3, "partner_id": 10, "name": "Iris"})).unwrap();
        assert_eq!(m.partner_id(), Some(10));
        assert_eq!(m.id(), Some(3));
    }
}
