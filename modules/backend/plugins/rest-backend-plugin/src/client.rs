//! HTTP client implementing every backend service.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use backend_sdk::{
    AuthApi, AuthSession, AuthStateChange, AuthUser, BackendError, ObjectStorage, Query, Row,
    RowStore,
};
use bytes::Bytes;
use console_security::SecretString;
use parking_lot::Mutex;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::instrument;
use uuid::Uuid;

use crate::config::RestBackendConfig;
use crate::postgrest::{parse_content_range_total, query_params};

const AUTH_EVENT_CAPACITY: usize = 64;

/// Client for the hosted backend.
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    events: broadcast::Sender<AuthStateChange>,
    /// Sessions issued through this client, so that sign-out can name the user.
    issued: Mutex<HashMap<String, Uuid>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: AuthUser,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: AuthUser },
    User(AuthUser),
}

impl RestBackend {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns `BackendError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &RestBackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            anon_key: config.anon_key.clone(),
            events,
            issued: Mutex::new(HashMap::new()),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or_else(|| self.anon_key.expose());
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", self.anon_key.expose())
            .bearer_auth(token)
    }

    fn table_request(&self, method: Method, query: &Query) -> RequestBuilder {
        let path = format!("/rest/v1/{}", urlencoding::encode(query.table_name()));
        self.request(
            method,
            &path,
            query.bearer_token().map(SecretString::expose),
        )
    }

    fn emit(&self, change: AuthStateChange) {
        if self.events.send(change).is_err() {
            tracing::trace!("auth state change dropped: no subscribers");
        }
    }
}

fn object_path(bucket: &str, path: &str) -> String {
    let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
    format!("{}/{}", urlencoding::encode(bucket), encoded.join("/"))
}

fn map_transport(e: &reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(e.to_string())
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
    let response = builder.send().await.map_err(|e| map_transport(&e))?;
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    tracing::debug!(status, %message, "backend request failed");
    Err(BackendError::from_status(status, message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let body = response.bytes().await.map_err(|e| map_transport(&e))?;
    serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Human-readable message out of an error body, whatever surface produced it.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_owned();
    };
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| value.get(k).and_then(Value::as_str))
        .map_or_else(|| body.trim().to_owned(), str::to_owned)
}

#[async_trait]
impl AuthApi for RestBackend {
    #[instrument(skip_all)]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let result = send(
            self.request(Method::POST, "/auth/v1/token", None)
                .query(&[("grant_type", "password")])
                .json(&json!({ "email": email, "password": password })),
        )
        .await;

        let response = match result {
            Ok(r) => r,
            Err(BackendError::InvalidRequest(_) | BackendError::Unauthorized(_)) => {
                return Err(BackendError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };
        let token: TokenResponse = decode(response).await?;

        self.issued
            .lock()
            .insert(token.access_token.clone(), token.user.id);

        let session = AuthSession {
            access_token: SecretString::new(token.access_token),
            refresh_token: token.refresh_token.map(SecretString::new),
            expires_in: token.expires_in,
            user: token.user,
        };
        self.emit(AuthStateChange::signed_in(session.clone()));
        Ok(session)
    }

    #[instrument(skip_all)]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, BackendError> {
        let result = send(
            self.request(Method::POST, "/auth/v1/signup", None)
                .json(&json!({ "email": email, "password": password, "data": metadata })),
        )
        .await;

        let response = match result {
            Ok(r) => r,
            Err(BackendError::InvalidRequest(msg)) if msg.contains("already registered") => {
                return Err(BackendError::Conflict(msg));
            }
            Err(e) => return Err(e),
        };
        match decode::<SignUpResponse>(response).await? {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => Ok(user),
        }
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let result = send(self.request(Method::POST, "/auth/v1/logout", Some(access_token))).await;
        match result {
            // Already revoked or expired: the session is gone either way.
            Ok(_) | Err(BackendError::Unauthorized(_) | BackendError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let user_id = self.issued.lock().remove(access_token);
        self.emit(AuthStateChange::signed_out(user_id));
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let result = send(self.request(Method::GET, "/auth/v1/user", Some(access_token))).await;
        match result {
            Ok(response) => decode(response).await,
            Err(BackendError::Forbidden(msg) | BackendError::NotFound(msg)) => {
                Err(BackendError::Unauthorized(msg))
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RowStore for RestBackend {
    #[instrument(skip_all, fields(table = %query.table_name()))]
    async fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let response = send(
            self.table_request(Method::GET, query)
                .query(&query_params(query, true)),
        )
        .await?;
        decode(response).await
    }

    #[instrument(skip_all, fields(table = %query.table_name()))]
    async fn count(&self, query: &Query) -> Result<u64, BackendError> {
        let response = send(
            self.table_request(Method::HEAD, query)
                .query(&query_params(query, true))
                .header("prefer", "count=exact"),
        )
        .await?;

        response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::Decode("missing or invalid Content-Range".to_owned()))
    }

    #[instrument(skip_all, fields(table = %query.table_name()))]
    async fn insert(&self, query: &Query, row: Row) -> Result<Row, BackendError> {
        let response = send(
            self.table_request(Method::POST, query)
                .header("prefer", "return=representation")
                .json(&row),
        )
        .await?;
        let rows: Vec<Row> = decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_owned()))
    }

    #[instrument(skip_all, fields(table = %query.table_name()))]
    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, BackendError> {
        let response = send(
            self.table_request(Method::PATCH, query)
                .query(&query_params(query, false))
                .header("prefer", "return=representation")
                .json(&patch),
        )
        .await?;
        decode(response).await
    }

    #[instrument(skip_all, fields(table = %query.table_name()))]
    async fn delete(&self, query: &Query) -> Result<u64, BackendError> {
        let response = send(
            self.table_request(Method::DELETE, query)
                .query(&query_params(query, false))
                .header("prefer", "return=representation"),
        )
        .await?;
        let rows: Vec<Row> = decode(response).await?;
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl ObjectStorage for RestBackend {
    #[instrument(skip(self, body, bearer), fields(size = body.len()))]
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
        bearer: Option<&str>,
    ) -> Result<String, BackendError> {
        let object = object_path(bucket, path);
        send(
            self.request(Method::POST, &format!("/storage/v1/object/{object}"), bearer)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body),
        )
        .await?;
        Ok(format!("{}/storage/v1/object/public/{object}", self.base_url))
    }
}
