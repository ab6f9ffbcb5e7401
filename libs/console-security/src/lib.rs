#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod activity;
pub mod context;
pub mod partner_scope;
pub mod principal;
pub mod secret;

pub use activity::{ActivityType, UnknownActivityType};
pub use context::SessionContext;
pub use partner_scope::PartnerScope;
pub use principal::{AdminType, Principal, Profile, ProfileFingerprint, Role};
pub use secret::SecretString;

/// Primary key of a row in the `partners` table.
pub type PartnerId = i64;

/// Primary key of a row in any activity table.
pub type ActivityId = i64;
