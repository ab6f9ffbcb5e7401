//! Plugin configuration.

use console_security::SecretString;
use serde::{Deserialize, Serialize};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestBackendConfig {
    /// Project base URL, e.g. `https://xyz.example.co`.
    pub url: String,

    /// Public (anonymous) API key sent as `apikey` on every request.
    pub anon_key: SecretString,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RestBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_owned(),
            anon_key: SecretString::default(),
            timeout_ms: 30_000,
        }
    }
}
