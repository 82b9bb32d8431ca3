//! Record store contract.
//!
//! Every data-access function in this crate talks to a [`RecordStore`]:
//! filtered/sorted/limited reads, exact counts, and insert/update/delete
//! by primary key. Rows travel as JSON objects and are decoded into typed
//! records with serde at the edge.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;

/// A single record as exchanged with the store. Always a JSON object.
pub type Row = serde_json::Value;

/// Column that scopes a record to its owning caller.
pub const OWNER_COLUMN: &str = "user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Personas,
    Conversations,
    Messages,
    Intelligence,
    SystemLogs,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Personas => "personas",
            Table::Conversations => "conversations",
            Table::Messages => "messages",
            Table::Intelligence => "intelligence",
            Table::SystemLogs => "system_logs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed right-hand side of a filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Uuid(Uuid),
    Text(String),
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

/// Predicate on a single column. Column names are fixed at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, FilterValue),
    Gte(&'static str, FilterValue),
    Lte(&'static str, FilterValue),
    NotNull(&'static str),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn gte(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Filter::Gte(column, value.into())
    }

    pub fn lte(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Filter::Lte(column, value.into())
    }

    pub fn not_null(column: &'static str) -> Self {
        Filter::NotNull(column)
    }

    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(column, _)
            | Filter::Gte(column, _)
            | Filter::Lte(column, _)
            | Filter::NotNull(column) => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// A filtered, optionally ordered and limited read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Exact row count. Back ends that cannot report a count return `None`.
    async fn count(&self, table: Table, filters: &[Filter]) -> Result<Option<i64>, StoreError>;

    /// Inserts `row` and echoes it back with generated fields filled in.
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    async fn update(&self, table: Table, id: Uuid, patch: Row) -> Result<(), StoreError>;

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), StoreError>;
}

pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(row)?)
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode_row).collect()
}

/// Serializes a payload into a row object, dropping `null` fields so that
/// partial updates leave unspecified columns untouched.
pub fn encode_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Ok(serde_json::Value::Object(map))
        }
        other => Err(StoreError::Decode(format!(
            "expected an object payload, got {other}"
        ))),
    }
}
