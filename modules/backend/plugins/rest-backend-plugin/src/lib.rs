//! REST backend plugin
//!
//! Talks to a hosted backend exposing three HTTP surfaces under one base URL:
//!
//! - `/auth/v1/*`: password sign-in, sign-up, sign-out and token introspection
//! - `/rest/v1/{table}`: PostgREST-style row access
//! - `/storage/v1/object/*`: bucket uploads
//!
//! Every request carries the project's `apikey`. Row and storage requests are
//! authorized with the caller's bearer token when the query has one, so the
//! backend's row-level policies apply to the signed-in principal.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod client;
pub mod config;
mod postgrest;

pub use client::RestBackend;
pub use config::RestBackendConfig;
