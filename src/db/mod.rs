//! One-shot typed wrappers over each table.
//!
//! Each function resolves the caller from the session, issues a single
//! query or mutation scoped to that caller, and decodes the result. Reads
//! without a caller return empty results; writes without one are
//! `Unauthorized`.

mod conversations;
mod intelligence;
mod logs;
mod messages;
mod personas;
mod profiles;

pub use conversations::{
    create_conversation, delete_conversation, get_conversation, list_conversations,
    update_conversation,
};
pub use intelligence::{create_intelligence_entry, delete_intelligence_entry, list_intelligence};
pub use logs::{list_system_logs, write_system_log};
pub use messages::{create_message, list_messages, list_recent_detections};
pub use personas::{create_persona, delete_persona, list_personas, update_persona};
pub use profiles::{get_profile, update_profile};

use serde::Serialize;

use crate::error::StoreError;
use crate::session::CallerId;
use crate::store::{encode_row, Row, OWNER_COLUMN};

/// Encodes an insert payload and stamps it with the owning caller.
fn owned_row<T: Serialize>(caller: CallerId, payload: &T) -> Result<Row, StoreError> {
    let mut row = encode_row(payload)?;
    if let Some(object) = row.as_object_mut() {
        object.insert(
            OWNER_COLUMN.to_string(),
            serde_json::Value::String(caller.to_string()),
        );
    }
    Ok(row)
}
