//! Marketplace admin module
//!
//! Backend-for-frontend of the marketplace administration console. The
//! public contract lives in `marketplace-admin-sdk` and is re-exported here.
//!
//! Every request is authenticated into a [`SessionContext`] by the
//! [`SessionGate`](domain::session::SessionGate), scoped by the
//! [`AccessResolver`](domain::access::AccessResolver) and served by one of
//! the per-vertical data services.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub use console_security::SessionContext;
pub use marketplace_admin_sdk::{AccessApi, ActivityRecord, Page, Record};

pub mod module;
pub use module::MarketplaceAdminModule;

pub mod api;
pub mod config;
pub mod domain;
pub mod errors;
