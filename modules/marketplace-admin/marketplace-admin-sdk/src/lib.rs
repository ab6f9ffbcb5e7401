//! Marketplace admin SDK
//!
//! Contract between the marketplace-admin module and its consumers:
//!
//! - typed row models for every vertical, partners, voyance feedback and
//!   billing tables
//! - [`Record`] / [`ActivityRecord`], the field metadata that drives form
//!   coercion and validation
//! - [`AccessApi`], the partner-scoped access-control resolver contract
//! - [`Page`], one page of a searched list

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod models;
pub mod page;
pub mod record;

pub use api::AccessApi;
pub use models::*;
pub use page::Page;
pub use record::{ActivityRecord, Record};
