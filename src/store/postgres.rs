//! Postgres-backed record store.
//!
//! Reads come back as `row_to_json` objects so every table shares one code
//! path; writes go through `jsonb_populate_record` so only the columns
//! present in the payload are touched and the rest keep their defaults.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};
use tracing::debug;
use uuid::Uuid;

use super::{Filter, FilterValue, Query, RecordStore, Row, Table};
use crate::config::DatabaseConfig;
use crate::error::StoreError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT row_to_json(t.*) AS row FROM ");
        qb.push(query.table.as_str()).push(" t WHERE TRUE");
        push_filters(&mut qb, &query.filters);

        if let Some(order) = query.order {
            qb.push(" ORDER BY ")
                .push(order.column)
                .push(if order.ascending { " ASC" } else { " DESC" });
        }
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        debug!(table = %query.table, filters = query.filters.len(), "query");
        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let value: serde_json::Value = row.try_get("row")?;
            out.push(value);
        }
        Ok(out)
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<Option<i64>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) AS total FROM ");
        qb.push(table.as_str()).push(" t WHERE TRUE");
        push_filters(&mut qb, filters);

        debug!(%table, filters = filters.len(), "count");
        let row = qb.build().fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        Ok(Some(total))
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        let columns = payload_columns(table, &row)?;
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO ");
        qb.push(table.as_str()).push(" AS t ");

        if columns.is_empty() {
            qb.push("DEFAULT VALUES");
        } else {
            let list = columns.join(", ");
            qb.push("(")
                .push(&list)
                .push(") SELECT ")
                .push(&list)
                .push(" FROM jsonb_populate_record(NULL::")
                .push(table.as_str())
                .push(", ")
                .push_bind(Json(row))
                .push(")");
        }
        qb.push(" RETURNING row_to_json(t.*) AS row");

        debug!(%table, columns = columns.len(), "insert");
        let inserted = qb.build().fetch_one(&self.pool).await?;
        Ok(inserted.try_get("row")?)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Row) -> Result<(), StoreError> {
        let columns = payload_columns(table, &patch)?;
        if columns.is_empty() {
            return Ok(());
        }
        let list = columns.join(", ");

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE ");
        qb.push(table.as_str())
            .push(" SET (")
            .push(&list)
            .push(") = (SELECT ")
            .push(&list)
            .push(" FROM jsonb_populate_record(NULL::")
            .push(table.as_str())
            .push(", ")
            .push_bind(Json(patch))
            .push(")) WHERE id = ")
            .push_bind(id);

        debug!(%table, %id, columns = columns.len(), "update");
        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: table.as_str(),
            });
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("DELETE FROM ");
        qb.push(table.as_str()).push(" WHERE id = ").push_bind(id);

        debug!(%table, %id, "delete");
        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: table.as_str(),
            });
        }
        Ok(())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for filter in filters {
        qb.push(" AND ").push(filter.column());
        match filter {
            Filter::NotNull(_) => {
                qb.push(" IS NOT NULL");
            }
            Filter::Eq(_, value) => {
                qb.push(" = ");
                push_value(qb, value);
            }
            Filter::Gte(_, value) => {
                qb.push(" >= ");
                push_value(qb, value);
            }
            Filter::Lte(_, value) => {
                qb.push(" <= ");
                push_value(qb, value);
            }
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Uuid(id) => qb.push_bind(*id),
        FilterValue::Text(text) => qb.push_bind(text.clone()),
        FilterValue::Bool(flag) => qb.push_bind(*flag),
        FilterValue::Int(n) => qb.push_bind(*n),
        FilterValue::Timestamp(ts) => qb.push_bind(*ts),
    };
}

/// Column names of a write payload. They end up in the statement text, so
/// anything that is not a plain identifier is rejected.
fn payload_columns(table: Table, row: &Row) -> Result<Vec<String>, StoreError> {
    let object = row.as_object().ok_or_else(|| {
        StoreError::Constraint(format!("write to {table} expects an object"))
    })?;
    object
        .keys()
        .map(|key| {
            if is_identifier(key) {
                Ok(key.clone())
            } else {
                Err(StoreError::Constraint(format!(
                    "invalid column name {key:?} for {table}"
                )))
            }
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers_are_plain_snake_case() {
        assert!(is_identifier("scam_type"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("name; DROP TABLE messages"));
        assert!(!is_identifier("Name"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn payload_columns_rejects_hostile_keys() {
        let err = payload_columns(Table::Messages, &json!({ "content\"": "x" })).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn payload_columns_lists_object_keys() {
        let columns =
            payload_columns(Table::Messages, &json!({ "content": "hi", "is_scam": true })).unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns.contains(&"is_scam".to_string()));
    }

    #[test]
    fn filters_render_as_bound_predicates() {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT 1 FROM messages t WHERE TRUE");
        push_filters(
            &mut qb,
            &[
                Filter::eq("user_id", Uuid::nil()),
                Filter::not_null("scam_type"),
                Filter::gte("created_at", chrono::Utc::now()),
            ],
        );
        assert_eq!(
            qb.sql(),
            concat!(
                "SELECT 1 FROM messages t WHERE TRUE AND user_id = $1",
                " AND scam_type IS NOT NULL AND created_at >= $2",
            )
        );
    }
}
