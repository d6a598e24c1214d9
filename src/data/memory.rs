//! In-process implementation of [`DataClient`]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{DataClient, Filter, Query, Row};
use crate::error::{Error, Result};

/// Kind of backend operation, used for call recording and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub table: String,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    failures: HashMap<(String, Operation), String>,
    calls: Vec<Call>,
}

/// Tables kept in memory.
///
/// Inserted rows get an `id` and `created_at` when they lack one. Failures
/// can be injected per table and operation, and every call is recorded.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation, so concurrent requests overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append rows to a table. Non-object values are ignored.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        if let Ok(mut state) = self.state.lock() {
            let entries = state.tables.entry(table.to_string()).or_default();
            entries.extend(rows.into_iter().filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            }));
        }
    }

    /// Snapshot of a table
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .map(|state| state.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Make every `operation` on `table` fail with `message`
    pub fn fail(&self, table: &str, operation: Operation, message: &str) {
        if let Ok(mut state) = self.state.lock() {
            state
                .failures
                .insert((table.to_string(), operation), message.to_string());
        }
    }

    /// Remove a previously injected failure
    pub fn recover(&self, table: &str, operation: Operation) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.remove(&(table.to_string(), operation));
        }
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<Call> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls of one kind on one table
    pub fn call_count(&self, table: &str, operation: Operation) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.table == table && c.operation == operation)
            .count()
    }

    async fn enter(&self, table: &str, operation: Operation) -> Result<MutexGuard<'_, State>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::general("memory backend lock poisoned"))?;
        state.calls.push(Call {
            operation,
            table: table.to_string(),
        });
        if let Some(message) = state.failures.get(&(table.to_string(), operation)) {
            return Err(Error::database(message));
        }
        Ok(state)
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // nulls sort last, as in Postgres ascending order
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn project(row: &Row, columns: &str) -> Row {
    if columns.trim() == "*" {
        return row.clone();
    }
    columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl DataClient for MemoryBackend {
    async fn select(&self, query: Query) -> Result<Vec<Row>> {
        let state = self.enter(&query.table, Operation::Select).await?;
        let mut rows: Vec<Row> = state
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_all(r, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);

        if let Some((column, ascending)) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(column), b.get(column));
                if *ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.iter().map(|r| project(r, &query.columns)).collect())
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row> {
        let mut state = self.enter(table, Operation::Insert).await?;
        if row.get("id").map_or(true, Value::is_null) {
            row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            row.insert(
                "created_at".into(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, patch: Row, filters: Vec<Filter>) -> Result<Vec<Row>> {
        let mut state = self.enter(table, Operation::Update).await?;
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches_all(r, &filters)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<Vec<Row>> {
        let mut state = self.enter(table, Operation::Delete).await?;
        let mut deleted = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            let (gone, kept): (Vec<Row>, Vec<Row>) =
                rows.drain(..).partition(|r| matches_all(r, &filters));
            *rows = kept;
            deleted = gone;
        }
        Ok(deleted)
    }
}
