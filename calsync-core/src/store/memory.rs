use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::credential::{Credential, Provider};
use crate::error::{CalSyncError, CalSyncResult};
use crate::event::Event;
use crate::store::{CredentialStore, EventStore, ensure_unique_identities};

/// In-process store. Used by tests and by embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<HashMap<String, Event>>,
    credentials: Mutex<HashMap<(String, Provider), Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> CalSyncResult<MutexGuard<'_, HashMap<String, Event>>> {
        self.events
            .lock()
            .map_err(|_| CalSyncError::Store("event store lock poisoned".into()))
    }

    fn credentials(&self) -> CalSyncResult<MutexGuard<'_, HashMap<(String, Provider), Credential>>> {
        self.credentials
            .lock()
            .map_err(|_| CalSyncError::Store("credential store lock poisoned".into()))
    }
}

impl EventStore for MemoryStore {
    fn get_event(&self, id: &str) -> CalSyncResult<Option<Event>> {
        Ok(self.events()?.get(id).cloned())
    }

    fn put_event(&self, event: &Event) -> CalSyncResult<()> {
        event.validate()?;
        let mut events = self.events()?;
        ensure_unique_identities(event, events.values())?;
        events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    fn delete_event(&self, id: &str) -> CalSyncResult<bool> {
        Ok(self.events()?.remove(id).is_some())
    }

    fn events_by_owner(&self, owner: &str) -> CalSyncResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events()?
            .values()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }
}

impl CredentialStore for MemoryStore {
    fn get_credential(&self, user: &str, provider: Provider) -> CalSyncResult<Option<Credential>> {
        Ok(self
            .credentials()?
            .get(&(user.to_string(), provider))
            .cloned())
    }

    fn put_credential(&self, credential: &Credential) -> CalSyncResult<()> {
        self.credentials()?.insert(
            (credential.user.clone(), credential.provider),
            credential.clone(),
        );
        Ok(())
    }

    fn delete_credential(&self, user: &str, provider: Provider) -> CalSyncResult<bool> {
        Ok(self
            .credentials()?
            .remove(&(user.to_string(), provider))
            .is_some())
    }
}
