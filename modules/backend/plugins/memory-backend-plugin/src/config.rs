//! Configuration for the in-memory backend plugin.

use std::collections::BTreeMap;

use backend_sdk::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryBackendConfig {
    /// Base URL used to build public object URLs.
    pub public_base_url: String,

    /// Auth users created at startup.
    pub users: Vec<SeedUser>,

    /// Rows inserted at startup, keyed by table name.
    pub tables: BTreeMap<String, Vec<Row>>,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8087".to_owned(),
            users: Vec::new(),
            tables: BTreeMap::new(),
        }
    }
}

/// One auth user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    /// Fixed id so that seeded rows can reference the user. Random when absent.
    #[serde(default)]
    pub id: Option<Uuid>,

    pub email: String,

    pub password: String,

    #[serde(default)]
    pub metadata: serde_json::Value,
}
