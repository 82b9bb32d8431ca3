//! In-process record store.
//!
//! Keeps rows as JSON objects per table and evaluates filters the same way
//! the Postgres back end does. Used by the test suites and handy for
//! running the CLI without a database.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Filter, FilterValue, Query, RecordStore, Row, Table};
use crate::error::StoreError;

type Tables = HashMap<Table, Vec<Map<String, Value>>>;

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<Table>>,
    calls: AtomicUsize,
    hide_counts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `count` reports no value, like a back end that was not
    /// asked for an exact count.
    pub fn without_counts() -> Self {
        Self {
            hide_counts: true,
            ..Self::default()
        }
    }

    /// Every subsequent call touching `table` fails with a transport error.
    pub fn fail_table(&self, table: Table) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(table);
        }
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Rows currently held for `table`, in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .lock()
            .map(|tables| {
                tables
                    .get(&table)
                    .map(|rows| rows.iter().cloned().map(Value::Object).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn enter(&self, table: Table) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let failing = self
            .failing
            .lock()
            .map_err(|_| StoreError::Transport("memory store lock poisoned".to_string()))?;
        if failing.contains(&table) {
            return Err(StoreError::Transport(format!("{table} is unavailable")));
        }
        drop(failing);
        self.tables
            .lock()
            .map_err(|_| StoreError::Transport("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let tables = self.enter(query.table)?;
        let mut rows: Vec<Map<String, Value>> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare_json(
                    a.get(order.column).unwrap_or(&Value::Null),
                    b.get(order.column).unwrap_or(&Value::Null),
                );
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }

        Ok(rows.into_iter().map(Value::Object).collect())
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<Option<i64>, StoreError> {
        let tables = self.enter(table)?;
        if self.hide_counts {
            return Ok(None);
        }
        let count = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| matches(row, f)))
                    .count()
            })
            .unwrap_or(0);
        Ok(Some(count as i64))
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let Value::Object(mut object) = row else {
            return Err(StoreError::Constraint(format!(
                "insert into {table} expects an object"
            )));
        };
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        object.entry("created_at").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });

        let mut tables = self.enter(table)?;
        let rows = tables.entry(table).or_default();
        if rows.iter().any(|existing| existing.get("id") == object.get("id")) {
            return Err(StoreError::Constraint(format!(
                "duplicate key value violates unique constraint on {table}.id"
            )));
        }
        rows.push(object.clone());
        Ok(Value::Object(object))
    }

    async fn update(&self, table: Table, id: Uuid, patch: Row) -> Result<(), StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::Constraint(format!(
                "update of {table} expects an object"
            )));
        };
        let mut tables = self.enter(table)?;
        let key = Value::String(id.to_string());
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row.get("id") == Some(&key)))
            .ok_or(StoreError::NotFound {
                table: table.as_str(),
            })?;
        for (column, value) in patch {
            row.insert(column, value);
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.enter(table)?;
        let key = Value::String(id.to_string());
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| row.get("id") != Some(&key));
        if rows.len() == before {
            return Err(StoreError::NotFound {
                table: table.as_str(),
            });
        }
        Ok(())
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).unwrap_or(&Value::Null);
    match filter {
        Filter::NotNull(_) => !cell.is_null(),
        Filter::Eq(_, value) => compare_cell(cell, value) == Some(Ordering::Equal),
        Filter::Gte(_, value) => matches!(
            compare_cell(cell, value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Filter::Lte(_, value) => matches!(
            compare_cell(cell, value),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// Compares a stored cell against a filter value. `None` means the two are
/// not comparable, which behaves like SQL's NULL comparison.
fn compare_cell(cell: &Value, value: &FilterValue) -> Option<Ordering> {
    match (cell, value) {
        (Value::Null, _) => None,
        (Value::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), FilterValue::Int(b)) => a.as_i64().map(|a| a.cmp(b)),
        (Value::String(a), FilterValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), FilterValue::Uuid(b)) => {
            Uuid::parse_str(a).ok().map(|a| a.cmp(b))
        }
        (Value::String(a), FilterValue::Timestamp(b)) => parse_timestamp(a).map(|a| a.cmp(b)),
        _ => None,
    }
}

fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a.cmp(b),
        },
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Order;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn insert_fills_generated_fields() {
        let store = MemoryStore::new();
        let row = store
            .insert(Table::Personas, json!({ "name": "Uncle Bert" }))
            .await
            .unwrap();
        assert!(row.get("id").and_then(Value::as_str).is_some());
        assert!(row.get("created_at").and_then(Value::as_str).is_some());
        assert_eq!(store.rows(Table::Personas).len(), 1);
    }

    #[tokio::test]
    async fn filters_compare_timestamps_not_strings() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for days_ago in [0, 3, 10] {
            let ts = now - Duration::days(days_ago);
            store
                .insert(Table::Messages, json!({ "created_at": ts.to_rfc3339() }))
                .await
                .unwrap();
        }

        let query = Query::new(Table::Messages)
            .filter(Filter::gte("created_at", now - Duration::days(5)))
            .order(Order::asc("created_at"));
        let rows = store.query(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn null_cells_never_match_equality() {
        let store = MemoryStore::new();
        store
            .insert(Table::Messages, json!({ "is_scam": null }))
            .await
            .unwrap();
        store
            .insert(Table::Messages, json!({ "is_scam": false }))
            .await
            .unwrap();

        let count = store
            .count(Table::Messages, &[Filter::eq("is_scam", false)])
            .await
            .unwrap();
        assert_eq!(count, Some(1));
    }

    #[tokio::test]
    async fn delete_of_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .delete(Table::Conversations, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { table: "conversations" }));
    }

    #[tokio::test]
    async fn failing_table_rejects_calls() {
        let store = MemoryStore::new();
        store.fail_table(Table::Intelligence);
        let err = store.count(Table::Intelligence, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
        assert!(store.count(Table::Messages, &[]).await.is_ok());
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn update_merges_patch_into_row() {
        let store = MemoryStore::new();
        let row = store
            .insert(Table::Conversations, json!({ "status": "active", "title": "Crypto" }))
            .await
            .unwrap();
        let id = Uuid::parse_str(row["id"].as_str().unwrap()).unwrap();

        store
            .update(Table::Conversations, id, json!({ "status": "ended" }))
            .await
            .unwrap();

        let rows = store.rows(Table::Conversations);
        assert_eq!(rows[0]["status"], "ended");
        assert_eq!(rows[0]["title"], "Crypto");
    }
}
