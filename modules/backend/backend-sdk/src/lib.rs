//! Backend SDK
//!
//! This crate defines the contract the console expects from the hosted
//! backend-as-a-service:
//!
//! - [`AuthApi`] - password sign-in, sign-up, sign-out, token introspection and
//!   the auth-state-change stream
//! - [`RowStore`] - query-builder style access to tables ([`Query`])
//! - [`ObjectStorage`] - bucket uploads returning public URLs
//! - [`BackendError`] - error type shared by every implementation
//!
//! Implementations live in the backend plugins (`rest-backend-plugin`,
//! `memory-backend-plugin`). Consumers hold a [`Backend`] bundle:
//!
//! ```ignore
//! let rows = backend.rows.select(&Query::table("partners").eq("user_id", uid)).await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod query;

pub use api::{AuthApi, Backend, ObjectStorage, RowStore};
pub use error::BackendError;
pub use models::{AuthEvent, AuthSession, AuthStateChange, AuthUser, Row};
pub use query::{Direction, Filter, Order, Query};
