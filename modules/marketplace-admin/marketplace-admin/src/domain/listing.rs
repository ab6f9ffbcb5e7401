//! Local search and fixed-size pagination of fetched lists.

use marketplace_admin_sdk::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query string of every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Case-insensitive substring matched against every scalar field.
    pub search: Option<String>,
    /// 1-based page number; `0` is read as `1`.
    pub page: Option<usize>,
}

/// Filter `items` by `query.search` and cut out the requested page.
///
/// A page past the end yields no items but still reports the totals.
pub fn paginate<T: Serialize>(items: Vec<T>, query: &ListQuery, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let matching: Vec<T> = match needle {
        Some(needle) => items
            .into_iter()
            .filter(|item| {
                serde_json::to_value(item).is_ok_and(|value| contains_text(&value, &needle))
            })
            .collect(),
        None => items,
    };

    let total = matching.len();
    let page = query.page.unwrap_or(1).max(1);
    let skip = (page - 1).saturating_mul(page_size);

    Page {
        items: matching.into_iter().skip(skip).take(page_size).collect(),
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
        notice: None,
    }
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Number(n) => n.to_string().contains(needle),
        Value::Bool(b) => b.to_string().contains(needle),
        Value::Array(items) => items.iter().any(|v| contains_text(v, needle)),
        Value::Object(map) => map.values().any(|v| contains_text(v, needle)),
    }
}
