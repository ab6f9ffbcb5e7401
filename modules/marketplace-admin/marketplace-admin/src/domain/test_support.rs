//! Shared fixtures for unit tests running against the in-memory backend.

use std::sync::Arc;

use backend_sdk::{AuthUser, Backend, Row};
use console_security::{ActivityId, ActivityType, AdminType, PartnerId, Role, SessionContext};
use memory_backend_plugin::MemoryBackend;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::{ConsoleConfig, ProvisioningConfig};
use crate::domain::access::{AccessResolver, PARTNERS_TABLE};
use crate::domain::session::{PROFILES_TABLE, SessionGate};

pub const PASSWORD: &str = "correct-horse";

pub struct Fixture {
    pub backend: Arc<MemoryBackend>,
    pub config: ConsoleConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_default_role(Role::User)
    }

    pub fn with_default_role(default_role: Role) -> Self {
        let mut config = ConsoleConfig::default();
        config.provisioning = ProvisioningConfig { default_role };
        Self {
            backend: Arc::new(MemoryBackend::new()),
            config,
        }
    }

    pub fn backend_handle(&self) -> Backend {
        Backend::from_client(self.backend.clone())
    }

    pub fn gate(&self) -> SessionGate {
        SessionGate::new(self.backend_handle(), &self.config.provisioning)
    }

    pub fn resolver(&self) -> AccessResolver {
        AccessResolver::new(self.backend_handle().rows)
    }

    /// Auth user plus its profile row.
    pub fn user(&self, email: &str, role: Role, admin_type: Option<AdminType>) -> (AuthUser, Row) {
        let user = self.backend.seed_user(email, PASSWORD);
        let profile = object(json!({
            "id": user.id.to_string(),
            "email": email,
            "first_name": null,
            "last_name": null,
            "role": role,
            "admin_type": admin_type,
        }));
        let stored = self.backend.seed_rows(PROFILES_TABLE, [profile]);
        (user, stored.into_iter().next().unwrap_or_default())
    }

    pub async fn signed_in(
        &self,
        email: &str,
        role: Role,
        admin_type: Option<AdminType>,
    ) -> SessionContext {
        self.user(email, role, admin_type);
        let (_, ctx) = self.gate().sign_in(email, PASSWORD).await.unwrap();
        ctx
    }

    pub fn partner(&self, id: PartnerId, owner: Option<Uuid>) {
        self.backend.seed_rows(
            PARTNERS_TABLE,
            [object(json!({
                "id": id,
                "business_name": format!("Partner {id}"),
                "business_type": "restaurant",
                "user_id": owner.map(|o| o.to_string()),
            }))],
        );
    }

    pub fn activity(&self, activity_type: ActivityType, id: ActivityId, partner: Option<PartnerId>) {
        let mut row = valid_form(activity_type);
        row.insert("id".to_owned(), json!(id));
        row.insert("partner_id".to_owned(), json!(partner));
        self.backend.seed_rows(activity_type.table(), [row]);
    }
}

/// Minimal set of values satisfying the required fields of `activity_type`.
pub fn valid_form(activity_type: ActivityType) -> Row {
    object(match activity_type {
        ActivityType::Restaurant => json!({"name": "Chez Lou", "city": "Paris"}),
        ActivityType::Accommodation => json!({
            "name": "Villa Azur", "accommodation_type": "villa",
            "city": "Nice", "price_per_night": 180.0
        }),
        ActivityType::Concert => json!({
            "title": "Jazz night", "artist": "Trio", "venue": "New Morning",
            "event_date": "2026-11-02"
        }),
        ActivityType::Nightlife => json!({
            "title": "Opening", "venue": "Le Baron", "event_date": "2026-11-03"
        }),
        ActivityType::Loisir => json!({"name": "Kayak", "category": "outdoor"}),
        ActivityType::CarRental => json!({"brand": "Renault", "model": "Clio", "price_per_day": 39.0}),
        ActivityType::TravelOffer => json!({"title": "Lisbon", "destination": "Lisbon", "price": 420.0}),
        ActivityType::Promotion => json!({"title": "Happy hour"}),
        ActivityType::BonPlan => json!({"title": "Two for one"}),
        ActivityType::VoyanceMedium => json!({"name": "Iris"}),
    })
}

pub fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
