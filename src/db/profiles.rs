use chrono::Utc;

use crate::error::StoreError;
use crate::models::{Profile, ProfileUpdate};
use crate::session::Session;
use crate::store::{decode_row, encode_row, Filter, Query, Table};

pub async fn get_profile(session: &Session<'_>) -> Result<Option<Profile>, StoreError> {
    let Some(caller) = session.caller() else {
        return Ok(None);
    };

    let query = Query::new(Table::Profiles)
        .filter(Filter::eq("id", caller))
        .limit(1);
    let rows = session.store().query(&query).await?;
    rows.into_iter().next().map(decode_row::<Profile>).transpose()
}

pub async fn update_profile(
    session: &Session<'_>,
    update: &ProfileUpdate,
) -> Result<(), StoreError> {
    let caller = session.require_caller()?;
    let mut patch = encode_row(update)?;
    if let Some(object) = patch.as_object_mut() {
        object.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
    }
    session
        .store()
        .update(Table::Profiles, caller.as_uuid(), patch)
        .await
}
