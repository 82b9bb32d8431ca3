//! Request-scoped access context.
//!
//! A [`Session`] pairs a record store handle with the caller the request
//! acts for. Data-access functions take a session instead of reaching for
//! a global client or ambient auth state.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{Filter, FilterValue, RecordStore, OWNER_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(Uuid);

impl CallerId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for CallerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<CallerId> for FilterValue {
    fn from(value: CallerId) -> Self {
        FilterValue::Uuid(value.0)
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Source of the current caller's identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_caller(&self) -> Result<Option<CallerId>, StoreError>;
}

/// Identity fixed up front, e.g. from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(pub Option<CallerId>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_caller(&self) -> Result<Option<CallerId>, StoreError> {
        Ok(self.0)
    }
}

#[derive(Clone, Copy)]
pub struct Session<'a> {
    store: &'a dyn RecordStore,
    caller: Option<CallerId>,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a dyn RecordStore, caller: Option<CallerId>) -> Self {
        Self { store, caller }
    }

    /// Builds a session for whoever `identity` reports as the current caller.
    pub async fn resolve(
        store: &'a dyn RecordStore,
        identity: &dyn IdentityProvider,
    ) -> Result<Session<'a>, StoreError> {
        let caller = identity.current_caller().await?;
        Ok(Self { store, caller })
    }

    pub fn store(&self) -> &'a dyn RecordStore {
        self.store
    }

    pub fn caller(&self) -> Option<CallerId> {
        self.caller
    }

    /// The caller, or `Unauthorized` for operations that must not run anonymously.
    pub fn require_caller(&self) -> Result<CallerId, StoreError> {
        self.caller.ok_or(StoreError::Unauthorized)
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}

/// Filter restricting rows to those owned by `caller`.
pub fn owned_by(caller: CallerId) -> Filter {
    Filter::eq(OWNER_COLUMN, caller)
}
