//! Table-scoped data access
//!
//! Every store talks to the backend through [`DataClient`]: read queries
//! built from a [`Query`], plus insert, update and delete by filter. The REST
//! implementation lives in [`crate::postgrest`]; [`MemoryBackend`] keeps the
//! tables in process.

mod filter;
mod memory;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub use filter::*;
pub use memory::*;

pub(crate) use filter::value_text;

/// A single table row as returned by the backend
pub type Row = serde_json::Map<String, Value>;

/// Table names used by the application
pub mod tables {
    pub const EVENTS: &str = "events";
    pub const TASKS: &str = "tasks";
    pub const IDEAS: &str = "ideas";
    pub const WORK_LOGS: &str = "work_logs";
    pub const PROFILES: &str = "profiles";
}

/// A read query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    /// Column and ascending flag
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Select every column of `table`
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Restrict the selected columns (comma separated)
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(mut self, column: &str, value: T) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<T: ToString>(mut self, column: &str, values: &[T]) -> Self {
        self.filters.push(Filter::in_list(column, values));
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }
}

/// Backend operations every store relies on
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Run a read query
    async fn select(&self, query: Query) -> Result<Vec<Row>>;

    /// Insert a row and return it as stored
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Apply `patch` to every row matching `filters`, returning the updated rows
    async fn update(&self, table: &str, patch: Row, filters: Vec<Filter>) -> Result<Vec<Row>>;

    /// Delete every row matching `filters`, returning the deleted rows
    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<Vec<Row>>;

    /// Run a read query and keep at most one row
    async fn select_one(&self, query: Query) -> Result<Option<Row>> {
        let rows = self.select(query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

/// Deserialize a set of rows into typed records
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

/// Deserialize one row into a typed record
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Serialize a record into a row
pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::general(format!(
            "expected a JSON object for a table row, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        id: String,
        name: String,
    }

    #[test]
    fn query_builder_collects_clauses() {
        let query = Query::table("tasks")
            .select("id,name")
            .eq("event_id", "e1")
            .order("created_at", false)
            .limit(10);

        assert_eq!(query.table, "tasks");
        assert_eq!(query.columns, "id,name");
        assert_eq!(query.filters, vec![Filter::eq("event_id", "e1")]);
        assert_eq!(query.order, Some(("created_at".to_string(), false)));
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn rows_convert_to_records() {
        let item = Item {
            id: "1".into(),
            name: "Setup".into(),
        };
        let row = to_row(&item).unwrap();
        assert_eq!(row["name"], "Setup");
        assert_eq!(from_row::<Item>(row).unwrap(), item);
        assert!(to_row(&"scalar").is_err());
    }
}
