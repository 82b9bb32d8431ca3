use chrono::Utc;
use uuid::Uuid;

use super::owned_row;
use crate::error::StoreError;
use crate::models::{Conversation, ConversationStatus, ConversationUpdate, NewConversation};
use crate::session::{owned_by, Session};
use crate::store::{decode_row, decode_rows, encode_row, Filter, Order, Query, Table};

pub async fn list_conversations(
    session: &Session<'_>,
    status: Option<ConversationStatus>,
) -> Result<Vec<Conversation>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let mut query = Query::new(Table::Conversations)
        .filter(owned_by(caller))
        .order(Order::desc("created_at"));
    if let Some(status) = status {
        query = query.filter(Filter::eq("status", status.as_str()));
    }
    decode_rows(session.store().query(&query).await?)
}

pub async fn get_conversation(
    session: &Session<'_>,
    id: Uuid,
) -> Result<Option<Conversation>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(None);
    };

    let query = Query::new(Table::Conversations)
        .filter(owned_by(caller))
        .filter(Filter::eq("id", id))
        .limit(1);
    let rows = session.store().query(&query).await?;
    rows.into_iter().next().map(decode_row::<Conversation>).transpose()
}

pub async fn create_conversation(
    session: &Session<'_>,
    conversation: &NewConversation,
) -> Result<Conversation, StoreError> {
    let caller = session.require_caller()?;
    let row = owned_row(caller, conversation)?;
    decode_row(session.store().insert(Table::Conversations, row).await?)
}

pub async fn update_conversation(
    session: &Session<'_>,
    id: Uuid,
    update: &ConversationUpdate,
) -> Result<(), StoreError> {
    session.require_caller()?;
    let mut patch = encode_row(update)?;
    if let Some(object) = patch.as_object_mut() {
        object.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
    }
    session.store().update(Table::Conversations, id, patch).await
}

pub async fn delete_conversation(session: &Session<'_>, id: Uuid) -> Result<(), StoreError> {
    session.require_caller()?;
    session.store().delete(Table::Conversations, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CallerId;
    use crate::store::memory::MemoryStore;

    fn new_conversation(title: &str, status: ConversationStatus) -> NewConversation {
        NewConversation {
            persona_id: None,
            title: title.to_string(),
            scammer_handle: Some("+1 555 0100".to_string()),
            status,
        }
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        create_conversation(&session, &new_conversation("Gift cards", ConversationStatus::Active))
            .await
            .unwrap();
        create_conversation(&session, &new_conversation("Tech support", ConversationStatus::Ended))
            .await
            .unwrap();

        let all = list_conversations(&session, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let active = list_conversations(&session, Some(ConversationStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Gift cards");
    }

    #[tokio::test]
    async fn get_is_scoped_to_caller() {
        let store = MemoryStore::new();
        let owner = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let stranger = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let created =
            create_conversation(&owner, &new_conversation("Romance", ConversationStatus::Active))
                .await
                .unwrap();

        assert!(get_conversation(&owner, created.id).await.unwrap().is_some());
        assert!(get_conversation(&stranger, created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_changes_status() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let created =
            create_conversation(&session, &new_conversation("Lottery", ConversationStatus::Active))
                .await
                .unwrap();

        update_conversation(
            &session,
            created.id,
            &ConversationUpdate {
                status: Some(ConversationStatus::Paused),
                ..ConversationUpdate::default()
            },
        )
        .await
        .unwrap();

        let fetched = get_conversation(&session, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ConversationStatus::Paused);
        assert!(fetched.updated_at.is_some());

        delete_conversation(&session, created.id).await.unwrap();
        assert!(get_conversation(&session, created.id).await.unwrap().is_none());
    }
}
