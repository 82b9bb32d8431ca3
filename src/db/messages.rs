use uuid::Uuid;

use super::owned_row;
use crate::error::StoreError;
use crate::models::{Message, NewMessage};
use crate::session::{owned_by, Session};
use crate::store::{decode_row, decode_rows, Filter, Order, Query, Table};

/// Messages of one conversation, oldest first.
pub async fn list_messages(
    session: &Session<'_>,
    conversation_id: Uuid,
) -> Result<Vec<Message>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let query = Query::new(Table::Messages)
        .filter(owned_by(caller))
        .filter(Filter::eq("conversation_id", conversation_id))
        .order(Order::asc("created_at"));
    decode_rows(session.store().query(&query).await?)
}

/// Most recent scam-flagged messages, newest first.
pub async fn list_recent_detections(
    session: &Session<'_>,
    limit: u32,
) -> Result<Vec<Message>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let query = Query::new(Table::Messages)
        .filter(owned_by(caller))
        .filter(Filter::eq("is_scam", true))
        .order(Order::desc("created_at"))
        .limit(limit);
    decode_rows(session.store().query(&query).await?)
}

pub async fn create_message(
    session: &Session<'_>,
    message: &NewMessage,
) -> Result<Message, StoreError> {
    let caller = session.require_caller()?;
    let row = owned_row(caller, message)?;
    decode_row(session.store().insert(Table::Messages, row).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use crate::session::CallerId;
    use crate::store::memory::MemoryStore;

    fn message(conversation_id: Uuid, content: &str, is_scam: Option<bool>) -> NewMessage {
        NewMessage {
            conversation_id: Some(conversation_id),
            sender: Sender::Scammer,
            content: content.to_string(),
            is_scam,
            scam_type: is_scam.filter(|flag| *flag).map(|_| "phishing".to_string()),
            confidence: Some(0.9),
        }
    }

    #[tokio::test]
    async fn conversation_messages_come_back_in_order() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let conversation_id = Uuid::new_v4();

        for content in ["hello dear", "send the code", "urgent!!"] {
            create_message(&session, &message(conversation_id, content, Some(true)))
                .await
                .unwrap();
        }
        create_message(&session, &message(Uuid::new_v4(), "elsewhere", None))
            .await
            .unwrap();

        let listed = list_messages(&session, conversation_id).await.unwrap();
        let contents: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello dear", "send the code", "urgent!!"]);
    }

    #[tokio::test]
    async fn recent_detections_respect_flag_and_limit() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let conversation_id = Uuid::new_v4();

        create_message(&session, &message(conversation_id, "hi", Some(false)))
            .await
            .unwrap();
        for content in ["wire me", "click this", "verify account"] {
            create_message(&session, &message(conversation_id, content, Some(true)))
                .await
                .unwrap();
        }

        let recent = list_recent_detections(&session, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|m| m.is_scam == Some(true)));
        assert!(recent[0].created_at >= recent[1].created_at);
    }
}
