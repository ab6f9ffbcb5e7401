//! In-memory implementation of the backend services.

use std::collections::HashMap;

use async_trait::async_trait;
use backend_sdk::{
    AuthApi, AuthSession, AuthStateChange, AuthUser, BackendError, Direction, ObjectStorage,
    Query, Row, RowStore,
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use console_security::SecretString;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::MemoryBackendConfig;
use crate::ordering::compare_cells;

const AUTH_EVENT_CAPACITY: usize = 64;
const SESSION_TTL_SECS: u64 = 3600;
const MIN_PASSWORD_LEN: usize = 6;

/// Kind of row operation, as recorded in the operation log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
    Upload,
}

struct Table {
    rows: Vec<Row>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

struct StoredUser {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Table>,
    /// Keyed by lower-cased email.
    users: HashMap<String, StoredUser>,
    /// Access token -> user id.
    sessions: HashMap<String, Uuid>,
    objects: HashMap<(String, String), Bytes>,
    /// Injected failures keyed by table or bucket name.
    failures: HashMap<String, BackendError>,
    ops: Vec<(String, OpKind)>,
}

impl State {
    fn begin(&mut self, target: &str, kind: OpKind) -> Result<(), BackendError> {
        self.ops.push((target.to_owned(), kind));
        match self.failures.get(target) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn user_by_id(&self, id: Uuid) -> Option<&StoredUser> {
        self.users.values().find(|u| u.user.id == id)
    }
}

/// Backend living entirely in process memory.
///
/// All state sits behind one `parking_lot::RwLock` that is never held across
/// an `.await`.
pub struct MemoryBackend {
    state: RwLock<State>,
    events: broadcast::Sender<AuthStateChange>,
    public_base_url: String,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&MemoryBackendConfig::default())
    }

    #[must_use]
    pub fn from_config(cfg: &MemoryBackendConfig) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        let backend = Self {
            state: RwLock::new(State::default()),
            events,
            public_base_url: cfg.public_base_url.trim_end_matches('/').to_owned(),
        };
        for seed in &cfg.users {
            backend.seed_user_with_id(
                seed.id.unwrap_or_else(Uuid::new_v4),
                &seed.email,
                &seed.password,
                seed.metadata.clone(),
            );
        }
        for (table, rows) in &cfg.tables {
            backend.seed_rows(table, rows.iter().cloned());
        }
        tracing::debug!(
            users = cfg.users.len(),
            tables = cfg.tables.len(),
            "memory backend seeded"
        );
        backend
    }

    /// Register an auth user with a random id.
    pub fn seed_user(&self, email: &str, password: &str) -> AuthUser {
        self.seed_user_with_id(Uuid::new_v4(), email, password, Value::Null)
    }

    pub fn seed_user_with_id(
        &self,
        id: Uuid,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> AuthUser {
        let user = AuthUser {
            id,
            email: Some(email.to_owned()),
            user_metadata: metadata,
        };
        self.state.write().users.insert(
            email.to_lowercase(),
            StoredUser {
                user: user.clone(),
                password: password.to_owned(),
            },
        );
        user
    }

    /// Insert rows without touching the operation log or injected failures.
    ///
    /// # Panics
    /// Panics if a seeded row collides with an existing primary key.
    #[allow(clippy::expect_used)]
    pub fn seed_rows(&self, table: &str, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let now = now_rfc3339();
        let mut state = self.state.write();
        let target = state.tables.entry(table.to_owned()).or_default();
        rows.into_iter()
            .map(|row| insert_row(target, row, &now).expect("seed rows must have unique ids"))
            .collect()
    }

    /// Snapshot of a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .read()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent operation on `target` (table or bucket) fail.
    pub fn fail_on(&self, target: &str, error: BackendError) {
        self.state.write().failures.insert(target.to_owned(), error);
    }

    pub fn clear_failures(&self) {
        self.state.write().failures.clear();
    }

    /// Number of operations issued against `target` since the last reset.
    #[must_use]
    pub fn operations(&self, target: &str) -> usize {
        self.state
            .read()
            .ops
            .iter()
            .filter(|(t, _)| t == target)
            .count()
    }

    #[must_use]
    pub fn operations_of(&self, target: &str, kind: OpKind) -> usize {
        self.state
            .read()
            .ops
            .iter()
            .filter(|(t, k)| t == target && *k == kind)
            .count()
    }

    #[must_use]
    pub fn total_operations(&self) -> usize {
        self.state.read().ops.len()
    }

    pub fn reset_operations(&self) {
        self.state.write().ops.clear();
    }

    #[must_use]
    pub fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        self.state
            .read()
            .objects
            .get(&(bucket.to_owned(), path.to_owned()))
            .cloned()
    }

    #[must_use]
    pub fn is_session_active(&self, access_token: &str) -> bool {
        self.state.read().sessions.contains_key(access_token)
    }

    fn emit(&self, change: AuthStateChange) {
        if self.events.send(change).is_err() {
            tracing::trace!("auth state change dropped: no subscribers");
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn insert_row(table: &mut Table, mut row: Row, now: &str) -> Result<Row, BackendError> {
    match row.get("id").cloned() {
        None | Some(Value::Null) => {
            row.insert("id".to_owned(), Value::from(table.next_id));
            table.next_id += 1;
        }
        Some(id) => {
            if table.rows.iter().any(|r| r.get("id") == Some(&id)) {
                return Err(BackendError::Conflict(format!(
                    "duplicate key value violates unique constraint (id={id})"
                )));
            }
            if let Some(n) = id.as_i64() {
                table.next_id = table.next_id.max(n + 1);
            }
        }
    }
    for column in ["created_at", "updated_at"] {
        if row.get(column).is_none_or(Value::is_null) {
            row.insert(column.to_owned(), Value::from(now));
        }
    }
    table.rows.push(row.clone());
    Ok(row)
}

fn project(row: &Row, columns: &str) -> Row {
    if columns.trim() == "*" {
        return row.clone();
    }
    columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_owned(), v.clone())))
        .collect()
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        let mut state = self.state.write();
        state.begin(query.table_name(), OpKind::Select)?;

        let Some(table) = state.tables.get(query.table_name()) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<&Row> = table.rows.iter().filter(|r| query.matches(r)).collect();

        if let Some(order) = query.order_by() {
            rows.sort_by(|a, b| {
                let ord = compare_cells(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        let (skip, take) = match query.row_range() {
            Some((from, to)) => (from, to - from + 1),
            None => (0, usize::MAX),
        };

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|r| project(r, query.columns()))
            .collect())
    }

    async fn count(&self, query: &Query) -> Result<u64, BackendError> {
        let mut state = self.state.write();
        state.begin(query.table_name(), OpKind::Count)?;
        let count = state
            .tables
            .get(query.table_name())
            .map_or(0, |t| t.rows.iter().filter(|r| query.matches(r)).count());
        Ok(count as u64)
    }

    async fn insert(&self, query: &Query, row: Row) -> Result<Row, BackendError> {
        let now = now_rfc3339();
        let mut state = self.state.write();
        state.begin(query.table_name(), OpKind::Insert)?;
        let table = state.tables.entry(query.table_name().to_owned()).or_default();
        insert_row(table, row, &now)
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, BackendError> {
        let now = now_rfc3339();
        let mut state = self.state.write();
        state.begin(query.table_name(), OpKind::Update)?;
        let Some(table) = state.tables.get_mut(query.table_name()) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in table.rows.iter_mut().filter(|r| query.matches(r)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            row.insert("updated_at".to_owned(), Value::from(now.as_str()));
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<u64, BackendError> {
        let mut state = self.state.write();
        state.begin(query.table_name(), OpKind::Delete)?;
        let Some(table) = state.tables.get_mut(query.table_name()) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|r| !query.matches(r));
        Ok((before - table.rows.len()) as u64)
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let session = {
            let mut state = self.state.write();
            let user = match state.users.get(&email.to_lowercase()) {
                Some(stored) if stored.password == password => stored.user.clone(),
                _ => return Err(BackendError::InvalidCredentials),
            };
            let token = format!("mem.{}", Uuid::new_v4().simple());
            state.sessions.insert(token.clone(), user.id);
            AuthSession {
                access_token: SecretString::new(token),
                refresh_token: None,
                expires_in: Some(SESSION_TTL_SECS),
                user,
            }
        };
        self.emit(AuthStateChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, BackendError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::InvalidRequest(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.state.read().users.contains_key(&email.to_lowercase()) {
            return Err(BackendError::Conflict("User already registered".to_owned()));
        }
        Ok(self.seed_user_with_id(Uuid::new_v4(), email, password, metadata))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let removed = self.state.write().sessions.remove(access_token);
        if let Some(user_id) = removed {
            self.emit(AuthStateChange::signed_out(Some(user_id)));
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let state = self.state.read();
        state
            .sessions
            .get(access_token)
            .and_then(|id| state.user_by_id(*id))
            .map(|stored| stored.user.clone())
            .ok_or_else(|| BackendError::Unauthorized("invalid JWT".to_owned()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        _content_type: &str,
        body: Bytes,
        _bearer: Option<&str>,
    ) -> Result<String, BackendError> {
        let mut state = self.state.write();
        state.begin(bucket, OpKind::Upload)?;
        let key = (bucket.to_owned(), path.to_owned());
        if state.objects.contains_key(&key) {
            return Err(BackendError::Conflict(format!(
                "object {bucket}/{path} already exists"
            )));
        }
        state.objects.insert(key, body);
        Ok(format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.public_base_url
        ))
    }
}
