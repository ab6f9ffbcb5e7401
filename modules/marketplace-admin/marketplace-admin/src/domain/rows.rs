//! Conversions between typed models and backend rows.

use backend_sdk::Row;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::error::DomainError;

/// Columns the backend maintains on its own.
pub const MANAGED_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

pub fn decode_row<T: DeserializeOwned>(row: Row, what: &str) -> Result<T, DomainError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        tracing::error!(error = %e, what, "backend row does not match the expected shape");
        DomainError::Backend {
            operation: format!("decode {what}"),
            source: backend_sdk::BackendError::Decode(e.to_string()),
        }
    })
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>, what: &str) -> Result<Vec<T>, DomainError> {
    rows.into_iter().map(|r| decode_row(r, what)).collect()
}

pub fn encode_row<T: Serialize>(value: &T) -> Result<Row, DomainError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DomainError::validation("form", "expected an object")),
        Err(e) => Err(DomainError::validation("form", e.to_string())),
    }
}

/// Integer id read from a row cell.
#[must_use]
pub fn cell_i64(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(Value::as_i64)
}
