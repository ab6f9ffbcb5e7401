//! Module configuration (`console` section).

use console_security::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Rows per page of every list endpoint.
    pub page_size: usize,
    pub provisioning: ProvisioningConfig,
    pub uploads: UploadsConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            provisioning: ProvisioningConfig::default(),
            uploads: UploadsConfig::default(),
        }
    }
}

/// Profiles created for principals that signed in without one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Role of a freshly provisioned profile. Anything other than `admin`
    /// means new principals are turned away until promoted.
    pub default_role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    pub max_upload_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_content_types: ["image/jpeg", "image/png", "image/webp", "image/gif"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_least_privileged() {
        let cfg = ConsoleConfig::default();
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.provisioning.default_role, Role::User);
        assert_eq!(cfg.uploads.max_upload_bytes, 5_242_880);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let cfg: ConsoleConfig =
            serde_json::from_value(json!({"provisioning": {"default_role": "editor"}})).unwrap();
        assert_eq!(cfg.provisioning.default_role, Role::Editor);
        assert_eq!(cfg.page_size, 10);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_value::<ConsoleConfig>(json!({"pagesize": 5}));
        assert!(res.is_err());
    }
}
