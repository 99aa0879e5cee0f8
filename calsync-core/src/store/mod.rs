//! Keyed record stores for events and credentials.
//!
//! Every write is a single-record upsert or delete. There is no transaction
//! spanning several records.

mod memory;

pub use memory::MemoryStore;

use crate::credential::{Credential, Provider};
use crate::error::{CalSyncError, CalSyncResult};
use crate::event::Event;

pub trait EventStore: Send + Sync {
    fn get_event(&self, id: &str) -> CalSyncResult<Option<Event>>;

    /// Insert or replace by id. Implementations validate the event and
    /// refuse a provider identity already held by another event.
    fn put_event(&self, event: &Event) -> CalSyncResult<()>;

    /// Returns whether a record was removed.
    fn delete_event(&self, id: &str) -> CalSyncResult<bool>;

    fn events_by_owner(&self, owner: &str) -> CalSyncResult<Vec<Event>>;
}

pub trait CredentialStore: Send + Sync {
    fn get_credential(&self, user: &str, provider: Provider) -> CalSyncResult<Option<Credential>>;

    fn put_credential(&self, credential: &Credential) -> CalSyncResult<()>;

    /// Returns whether a record was removed.
    fn delete_credential(&self, user: &str, provider: Provider) -> CalSyncResult<bool>;
}

/// Check `event` against every other stored event for a clash on
/// `remote_id` or `feed_uid`.
pub fn ensure_unique_identities<'a>(
    event: &Event,
    existing: impl IntoIterator<Item = &'a Event>,
) -> CalSyncResult<()> {
    for other in existing {
        if other.id == event.id {
            continue;
        }
        for provider in Provider::ALL {
            if let (Some(mine), Some(theirs)) =
                (event.identity_for(provider), other.identity_for(provider))
            {
                if mine == theirs {
                    return Err(CalSyncError::DuplicateIdentity {
                        identity: mine.to_string(),
                        event_ids: vec![other.id.clone(), event.id.clone()],
                    });
                }
            }
        }
    }
    Ok(())
}
