use uuid::Uuid;

use super::owned_row;
use crate::error::StoreError;
use crate::models::{NewPersona, Persona, PersonaUpdate};
use crate::session::{owned_by, Session};
use crate::store::{decode_row, decode_rows, encode_row, Order, Query, Table};

pub async fn list_personas(session: &Session<'_>) -> Result<Vec<Persona>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(Vec::new());
    };

    let query = Query::new(Table::Personas)
        .filter(owned_by(caller))
        .order(Order::desc("created_at"));
    decode_rows(session.store().query(&query).await?)
}

pub async fn create_persona(
    session: &Session<'_>,
    persona: &NewPersona,
) -> Result<Persona, StoreError> {
    let caller = session.require_caller()?;
    let row = owned_row(caller, persona)?;
    decode_row(session.store().insert(Table::Personas, row).await?)
}

pub async fn update_persona(
    session: &Session<'_>,
    id: Uuid,
    update: &PersonaUpdate,
) -> Result<(), StoreError> {
    session.require_caller()?;
    session
        .store()
        .update(Table::Personas, id, encode_row(update)?)
        .await
}

pub async fn delete_persona(session: &Session<'_>, id: Uuid) -> Result<(), StoreError> {
    session.require_caller()?;
    session.store().delete(Table::Personas, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CallerId;
    use crate::store::memory::MemoryStore;

    fn persona(name: &str) -> NewPersona {
        NewPersona {
            name: name.to_string(),
            description: Some("retired, chatty, slow to pay".to_string()),
            personality: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn personas_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let alice = CallerId::from(Uuid::new_v4());
        let bob = CallerId::from(Uuid::new_v4());

        create_persona(&Session::new(&store, Some(alice)), &persona("Grandma Rose"))
            .await
            .unwrap();
        create_persona(&Session::new(&store, Some(bob)), &persona("Uncle Bert"))
            .await
            .unwrap();

        let mine = list_personas(&Session::new(&store, Some(alice))).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Grandma Rose");
        assert_eq!(mine[0].user_id, alice.as_uuid());
    }

    #[tokio::test]
    async fn update_then_delete_persona() {
        let store = MemoryStore::new();
        let session = Session::new(&store, Some(CallerId::from(Uuid::new_v4())));
        let created = create_persona(&session, &persona("Grandma Rose")).await.unwrap();

        update_persona(
            &session,
            created.id,
            &PersonaUpdate {
                is_active: Some(false),
                ..PersonaUpdate::default()
            },
        )
        .await
        .unwrap();
        let listed = list_personas(&session).await.unwrap();
        assert!(!listed[0].is_active);
        assert_eq!(listed[0].description, created.description);

        delete_persona(&session, created.id).await.unwrap();
        assert!(list_personas(&session).await.unwrap().is_empty());

        let err = delete_persona(&session, created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { table: "personas" }));
    }

    #[tokio::test]
    async fn anonymous_writes_are_unauthorized() {
        let store = MemoryStore::new();
        let session = Session::new(&store, None);
        let err = create_persona(&session, &persona("Nobody")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));
        assert!(list_personas(&session).await.unwrap().is_empty());
        assert_eq!(store.calls(), 0);
    }
}
