//! Boundary traits implemented by the backend plugins.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use crate::error::BackendError;
use crate::models::{AuthSession, AuthStateChange, AuthUser, Row};
use crate::query::Query;

/// Backend authentication service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` when the pair is rejected
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    /// Register a new user. `metadata` is stored as the user's metadata object.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<AuthUser, BackendError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Resolve the user owning `access_token`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for missing, expired or revoked tokens
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    /// Subscribe to auth state changes produced by this client.
    ///
    /// Events are delivered in the order they were emitted; slow receivers
    /// may observe `RecvError::Lagged`.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Table storage with a query-builder interface.
///
/// Implementations apply the query's bearer token so that the backend's own
/// row-level policies decide what the caller may see; that is the security
/// boundary, not the console's client-side checks.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError>;

    /// Number of rows matching the query's filters, without fetching them.
    async fn count(&self, query: &Query) -> Result<u64, BackendError>;

    /// Insert one row into the query's table and return it as stored.
    async fn insert(&self, query: &Query, row: Row) -> Result<Row, BackendError>;

    /// Apply `patch` to every row matching the query and return the updated rows.
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, BackendError>;

    /// Delete every row matching the query and return how many were removed.
    async fn delete(&self, query: &Query) -> Result<u64, BackendError>;

    /// First row matching the query, if any.
    async fn select_one(&self, query: &Query) -> Result<Option<Row>, BackendError> {
        let rows = self.select(&query.clone().range(0, 0)).await?;
        Ok(rows.into_iter().next())
    }
}

/// Object storage organised in buckets.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `body` at `path` inside `bucket` and return its public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
        bearer: Option<&str>,
    ) -> Result<String, BackendError>;
}

/// The three backend services, as held by the console.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthApi>,
    pub rows: Arc<dyn RowStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Backend {
    /// Bundle a single client implementing every service.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: AuthApi + RowStore + ObjectStorage + 'static,
    {
        Self {
            auth: client.clone(),
            rows: client.clone(),
            storage: client,
        }
    }
}
