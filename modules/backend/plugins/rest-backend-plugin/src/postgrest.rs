//! Encoding of [`Query`] into PostgREST request parameters.

use backend_sdk::{Direction, Filter, Query};
use serde_json::Value;

/// Query-string pairs selecting the rows addressed by `query`.
///
/// `include_select` is false for verbs that ignore projection.
pub(crate) fn query_params(query: &Query, include_select: bool) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(query.filters().len() + 4);

    if include_select {
        params.push(("select".to_owned(), query.columns().replace(' ', "")));
    }

    for filter in query.filters() {
        let op = match filter {
            Filter::Eq { value: Value::Null, .. } => "is.null".to_owned(),
            Filter::Eq { value, .. } => format!("eq.{}", scalar(value)),
            Filter::In { values, .. } => {
                let items: Vec<String> = values.iter().map(list_item).collect();
                format!("in.({})", items.join(","))
            }
        };
        params.push((filter.column().to_owned(), op));
    }

    if let Some(order) = query.order_by() {
        let dir = match order.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".to_owned(), format!("{}.{dir}", order.column)));
    }

    if let Some((from, to)) = query.row_range() {
        params.push(("offset".to_owned(), from.to_string()));
        params.push(("limit".to_owned(), (to - from + 1).to_string()));
    }

    params
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strings inside `in.(...)` are double-quoted so that commas and
/// parentheses in values survive.
fn list_item(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

/// Total row count from a `Content-Range` header such as `0-9/42` or `*/0`.
pub(crate) fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
