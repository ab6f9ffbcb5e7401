#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for marketplace-admin integration tests

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use backend_sdk::{Backend, Row};
use console_security::{ActivityId, ActivityType, AdminType, PartnerId, Role};
use marketplace_admin::MarketplaceAdminModule;
use marketplace_admin::config::ConsoleConfig;
use marketplace_admin::domain::access::PARTNERS_TABLE;
use marketplace_admin::domain::session::PROFILES_TABLE;
use memory_backend_plugin::MemoryBackend;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse";

pub struct TestApp {
    pub backend: Arc<MemoryBackend>,
    pub module: MarketplaceAdminModule,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ConsoleConfig::default())
    }

    pub fn with_config(config: ConsoleConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let module = MarketplaceAdminModule::new(Backend::from_client(backend.clone()), config);
        let router = module.router();
        Self {
            backend,
            module,
            router,
        }
    }

    /// Auth user plus profile row; returns the user id.
    pub fn user(&self, email: &str, role: Role, admin_type: Option<AdminType>) -> Uuid {
        let user = self.backend.seed_user(email, PASSWORD);
        self.backend.seed_rows(
            PROFILES_TABLE,
            [row(json!({
                "id": user.id.to_string(),
                "email": email,
                "role": role,
                "admin_type": admin_type,
            }))],
        );
        user.id
    }

    pub fn partner(&self, id: PartnerId, owner: Option<Uuid>) {
        self.backend.seed_rows(
            PARTNERS_TABLE,
            [row(json!({
                "id": id,
                "business_name": format!("Partner {id}"),
                "business_type": "restaurant",
                "user_id": owner.map(|o| o.to_string()),
            }))],
        );
    }

    pub fn restaurant(&self, id: ActivityId, partner: Option<PartnerId>, name: &str) {
        self.backend.seed_rows(
            ActivityType::Restaurant.table(),
            [row(json!({
                "id": id,
                "partner_id": partner,
                "name": name,
                "city": "Paris",
            }))],
        );
    }

    pub fn accommodation(&self, id: ActivityId, partner: Option<PartnerId>) {
        self.backend.seed_rows(
            ActivityType::Accommodation.table(),
            [row(json!({
                "id": id,
                "partner_id": partner,
                "name": "Villa",
                "accommodation_type": "villa",
                "city": "Nice",
                "price_per_night": 120.0,
            }))],
        );
    }

    pub async fn sign_in(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/auth/v1/sign-in",
                None,
                Some(json!({"email": email, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_owned()
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
