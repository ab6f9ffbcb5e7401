use uuid::Uuid;

use crate::{Principal, Profile, SecretString};

/// `SessionContext` carries the authenticated principal, its profile and the
/// bearer token of the backend session through one request or operation.
///
/// It is built only after the admin gate has passed, so holders can rely on
/// `profile().is_admin()` being true.
#[derive(Debug, Clone)]
pub struct SessionContext {
    principal: Principal,
    profile: Profile,
    access_token: SecretString,
}

impl SessionContext {
    #[must_use]
    pub fn new(principal: Principal, profile: Profile, access_token: SecretString) -> Self {
        Self {
            principal,
            profile,
            access_token,
        }
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    #[must_use]
    pub fn principal_id(&self) -> Uuid {
        self.principal.id
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Token forwarded to the backend so its row-level policies apply.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.profile.is_super_admin()
    }

    #[must_use]
    pub fn can_access_all_data(&self) -> bool {
        self.profile.can_access_all_data()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{AdminType, Role};

    #[test]
    fn debug_output_redacts_token() {
        let principal = Principal::new(Uuid::new_v4(), Some("root@example.com".to_owned()));
        let mut profile = Profile::provisioned(&principal, Role::Admin);
        profile.admin_type = Some(AdminType::SuperAdmin);
        let ctx = SessionContext::new(principal, profile, SecretString::new("tok-123"));

        assert_eq!(ctx.access_token(), "tok-123");
        assert!(!format!("{ctx:?}").contains("tok-123"));
        assert!(ctx.can_access_all_data());
    }
}
