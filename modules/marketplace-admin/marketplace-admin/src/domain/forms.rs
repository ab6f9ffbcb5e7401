//! Coercion and validation of submitted form values.
//!
//! Forms post every input as a string. Before anything reaches the backend,
//! values are normalised against the record's field metadata and required
//! fields are checked; all violations are reported at once.

use marketplace_admin_sdk::Record;
use serde_json::{Map, Number, Value};

use crate::domain::error::{DomainError, FieldViolation};
use crate::domain::rows::MANAGED_COLUMNS;

/// Raw values of a submitted form, keyed by field name.
pub type FormValues = Map<String, Value>;

/// Keys holding row references, coerced like numeric fields.
const REFERENCE_FIELDS: [&str; 2] = ["id", "partner_id"];

/// Normalise `form` for `R` and check its required fields.
///
/// - strings are trimmed and blank strings become `null`
/// - numeric fields parse to integers when possible, floats otherwise
/// - boolean fields accept `true/false`, `on/off`, `yes/no`, `1/0`
/// - list fields split comma separated strings
/// - `created_at` / `updated_at` are dropped
///
/// # Errors
/// `DomainError::Validation` listing every invalid or missing field.
pub fn prepare<R: Record>(form: FormValues) -> Result<FormValues, DomainError> {
    normalise::<R>(form, true)
}

/// Normalise a partial update of an existing `R`.
///
/// Only submitted keys are kept. A required field is a violation only when
/// it is submitted blank; absent fields keep their stored value.
///
/// # Errors
/// `DomainError::Validation` listing every invalid or blanked field.
pub fn prepare_patch<R: Record>(form: FormValues) -> Result<FormValues, DomainError> {
    normalise::<R>(form, false)
}

/// Whether the form names an existing row.
#[must_use]
pub fn targets_existing_row(form: &FormValues) -> bool {
    match form.get("id") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn normalise<R: Record>(form: FormValues, complete: bool) -> Result<FormValues, DomainError> {
    let mut violations = Vec::new();
    let mut out = FormValues::new();

    for (field, value) in form {
        if MANAGED_COLUMNS[1..].contains(&field.as_str()) {
            continue;
        }
        match coerce::<R>(&field, value) {
            Ok(v) => {
                out.insert(field, v);
            }
            Err(message) => violations.push(FieldViolation::new(field, message)),
        }
    }

    for required in R::REQUIRED {
        let missing = match out.get(*required) {
            None => complete,
            Some(v) => v.is_null(),
        };
        let already_reported = violations.iter().any(|v| v.field == *required);
        if missing && !already_reported {
            violations.push(FieldViolation::new(*required, "is required"));
        }
    }

    if violations.is_empty() {
        Ok(out)
    } else {
        Err(DomainError::Validation(violations))
    }
}

fn coerce<R: Record>(field: &str, value: Value) -> Result<Value, String> {
    let Value::String(raw) = value else {
        return Ok(value);
    };
    let text = raw.trim();
    if text.is_empty() {
        return Ok(if R::LISTS.contains(&field) {
            Value::Array(Vec::new())
        } else {
            Value::Null
        });
    }

    if R::NUMERIC.contains(&field) || REFERENCE_FIELDS.contains(&field) {
        return parse_number(text).ok_or_else(|| "must be a number".to_owned());
    }
    if R::BOOLEAN.contains(&field) {
        return parse_bool(text)
            .map(Value::Bool)
            .ok_or_else(|| "must be true or false".to_owned());
    }
    if R::LISTS.contains(&field) {
        return Ok(Value::Array(
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_owned()))
                .collect(),
        ));
    }
    Ok(Value::String(text.to_owned()))
}

fn parse_number(text: &str) -> Option<Value> {
    let text = text.replace(',', ".");
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
