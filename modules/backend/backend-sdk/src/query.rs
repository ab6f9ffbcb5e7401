//! Query builder for row storage.

use console_security::SecretString;
use serde_json::Value;

use crate::models::Row;

/// Row filter. All filters of a [`Query`] are combined with AND.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
}

impl Filter {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => column,
        }
    }

    /// Evaluate the filter against a row. A missing column behaves as `null`.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq { value, .. } => cell == value,
            Self::In { values, .. } => values.contains(cell),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Table query: target table, projected columns, filters, ordering and an
/// inclusive row range.
///
/// The same builder addresses selects, counts, updates and deletes; inserts
/// only use the table name and caller token.
///
/// ```ignore
/// let q = Query::table("restaurants")
///     .in_list("partner_id", [10, 12])
///     .order("created_at", Direction::Desc)
///     .range(0, 9);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[must_use]
pub struct Query {
    table: String,
    columns: String,
    filters: Vec<Filter>,
    order: Option<Order>,
    range: Option<(usize, usize)>,
    bearer: Option<SecretString>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            columns: "*".to_owned(),
            filters: Vec::new(),
            order: None,
            range: None,
            bearer: None,
        }
    }

    /// Comma separated column list, `*` by default.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn in_list<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Inclusive zero-based row range, `from..=to`.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    /// Run the query on behalf of the holder of `token` so that the backend's
    /// row-level policies apply to that principal.
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(SecretString::new(token));
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &str {
        &self.columns
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn order_by(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    #[must_use]
    pub fn row_range(&self) -> Option<(usize, usize)> {
        self.range
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&SecretString> {
        self.bearer.as_ref()
    }

    /// True if every filter matches `row`.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// An `IN` filter over an empty list can never match.
    #[must_use]
    pub fn is_trivially_empty(&self) -> bool {
        self.filters
            .iter()
            .any(|f| matches!(f, Filter::In { values, .. } if values.is_empty()))
    }
}
