//! Filtered table queries.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Record;

/// Sort order for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A query against one named collection: equality filters, an optional sort
/// and an optional row limit.
///
/// ```
/// use launchpad_identity::directory::TableQuery;
///
/// let query = TableQuery::table("waitlist_users")
///     .eq("priority_level", "vip")
///     .order("position", true)
///     .limit(10);
/// assert_eq!(query.name(), "waitlist_users");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    table: String,
    filters: Vec<(String, Value)>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl TableQuery {
    /// Start a query on `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Keep only rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Sort by `column`. Nulls sort last.
    #[must_use]
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The collection this query targets.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    /// Whether `record` passes every equality filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| record.get(column).unwrap_or(&Value::Null) == value)
    }

    /// Sort and truncate already-filtered rows.
    #[must_use]
    pub fn finish(&self, mut rows: Vec<Record>) -> Vec<Record> {
        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&Value::Null);
                let right = b.get(&order.column).unwrap_or(&Value::Null);
                compare_values(left, right, order.ascending)
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Compare two column values. Timestamps compare chronologically and nulls
/// sort after everything else regardless of direction.
fn compare_values(left: &Value, right: &Value, ascending: bool) -> Ordering {
    let ordering = match (left, right) {
        (Value::Null, Value::Null) => return Ordering::Equal,
        (Value::Null, _) => return Ordering::Greater,
        (_, Value::Null) => return Ordering::Less,
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(l), Value::String(r)) => {
            match (
                l.parse::<DateTime<Utc>>(),
                r.parse::<DateTime<Utc>>(),
            ) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                _ => l.cmp(r),
            }
        }
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => Ordering::Equal,
    };
    if ascending { ordering } else { ordering.reverse() }
}
