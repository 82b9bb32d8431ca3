use uuid::Uuid;

use super::owned_row;
use crate::error::StoreError;
use crate::models::{IntelligenceEntry, NewIntelligenceEntry};
use crate::session::{owned_by, Session};
use crate::store::{decode_row, decode_rows, Filter, Order, Query, Table};

pub async fn list_intelligence(
    session: &Session<'_>,
    conversation_id: Option<Uuid>,
) -> Result<Vec<IntelligenceEntry>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let mut query = Query::new(Table::Intelligence)
        .filter(owned_by(caller))
        .order(Order::desc("created_at"));
    if let Some(conversation_id) = conversation_id {
        query = query.filter(Filter::eq("conversation_id", conversation_id));
    }
    decode_rows(session.store().query(&query).await?)
}

pub async fn create_intelligence_entry(
    session: &Session<'_>,
    entry: &NewIntelligenceEntry,
) -> Result<IntelligenceEntry, StoreError> {
    let caller = session.require_caller()?;
    let row = owned_row(caller, entry)?;
    decode_row(session.store().insert(Table::Intelligence, row).await?)
}

pub async fn delete_intelligence_entry(session: &Session<'_>, id: Uuid) -> Result<(), StoreError> {
    session.require_caller()?;
    session.store().delete(Table::Intelligence, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CallerId;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn entries_filter_by_conversation() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let conversation_id = Uuid::new_v4();

        let wallet = create_intelligence_entry(
            &session,
            &NewIntelligenceEntry {
                conversation_id: Some(conversation_id),
                entry_type: "crypto_wallet".to_string(),
                value: "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh".to_string(),
                confidence: Some(0.8),
            },
        )
        .await
        .unwrap();
        create_intelligence_entry(
            &session,
            &NewIntelligenceEntry {
                conversation_id: None,
                entry_type: "phone_number".to_string(),
                value: "+44 20 7946 0000".to_string(),
                confidence: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(list_intelligence(&session, None).await.unwrap().len(), 2);
        let scoped = list_intelligence(&session, Some(conversation_id)).await.unwrap();
        assert_eq!(scoped, vec![wallet.clone()]);

        delete_intelligence_entry(&session, wallet.id).await.unwrap();
        assert!(list_intelligence(&session, Some(conversation_id))
            .await
            .unwrap()
            .is_empty());
    }
}
