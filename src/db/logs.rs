use serde::Serialize;
use tracing::warn;

use crate::error::StoreError;
use crate::models::{LogLevel, SystemLog};
use crate::session::{owned_by, Session};
use crate::store::{decode_rows, encode_row, Order, Query, Table};

#[derive(Serialize)]
struct NewSystemLog<'a> {
    user_id: Option<String>,
    level: LogLevel,
    message: &'a str,
    metadata: Option<serde_json::Value>,
}

pub async fn list_system_logs(
    session: &Session<'_>,
    limit: u32,
) -> Result<Vec<SystemLog>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let query = Query::new(Table::SystemLogs)
        .filter(owned_by(caller))
        .order(Order::desc("created_at"))
        .limit(limit);
    decode_rows(session.store().query(&query).await?)
}

/// Records a system log entry. Best effort: a failed write is reported as a
/// warning and handed back, and callers are free to drop the result. Works
/// without a caller, in which case the entry is unowned.
pub async fn write_system_log(
    session: &Session<'_>,
    level: LogLevel,
    message: &str,
    metadata: Option<serde_json::Value>,
) -> Result<(), StoreError> {
    let entry = NewSystemLog {
        user_id: session.caller().map(|caller| caller.to_string()),
        level,
        message,
        metadata,
    };

    let result = match encode_row(&entry) {
        Ok(row) => session
            .store()
            .insert(Table::SystemLogs, row)
            .await
            .map(|_| ()),
        Err(err) => Err(err),
    };
    if let Err(err) = &result {
        warn!(error = %err, ?level, "failed to write system log");
    }
    result
}
