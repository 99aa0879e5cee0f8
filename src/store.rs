//! File-per-record JSON store.
//!
//! Layout under the data directory:
//!   events/<event id>.json
//!   credentials/<user>/<provider>.json

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use calsync_core::store::{CredentialStore, EventStore, ensure_unique_identities};
use calsync_core::{CalSyncError, CalSyncResult, Credential, Event, Provider};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub struct FileStore {
    root: PathBuf,
    /// Serializes identity checks with the write that follows them
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(root: &Path) -> CalSyncResult<Self> {
        std::fs::create_dir_all(root.join("events"))?;
        std::fs::create_dir_all(root.join("credentials"))?;
        Ok(FileStore {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> CalSyncResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| CalSyncError::Store("store lock poisoned".into()))
    }

    fn event_path(&self, id: &str) -> PathBuf {
        self.root.join("events").join(format!("{}.json", slug(id)))
    }

    fn credential_path(&self, user: &str, provider: Provider) -> PathBuf {
        self.root
            .join("credentials")
            .join(slug(user))
            .join(format!("{}.json", provider))
    }

    fn all_events(&self) -> CalSyncResult<Vec<Event>> {
        let mut events = Vec::new();
        for entry in std::fs::read_dir(self.root.join("events"))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                events.push(read_json(&path)?);
            }
        }
        Ok(events)
    }
}

/// Make an identifier safe to use as a file name.
fn slug(id: &str) -> String {
    id.replace(['/', '\\', ':', '.'], "_")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CalSyncResult<T> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| CalSyncError::Store(format!("Failed to parse {}: {}", path.display(), e)))
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> CalSyncResult<Option<T>> {
    if path.exists() {
        read_json(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Write through a temp file and rename, so readers never see half a record.
fn write_json<T: Serialize>(path: &Path, value: &T, private: bool) -> CalSyncResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| CalSyncError::Store(format!("No parent directory for {}", path.display())))?;
    std::fs::create_dir_all(dir)?;

    let contents = serde_json::to_string_pretty(value)?;
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, contents)?;

    // Credentials carry OAuth tokens, keep them owner-only (0600)
    #[cfg(unix)]
    if private {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = private;

    std::fs::rename(&temp, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> CalSyncResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl EventStore for FileStore {
    fn get_event(&self, id: &str) -> CalSyncResult<Option<Event>> {
        read_optional(&self.event_path(id))
    }

    fn put_event(&self, event: &Event) -> CalSyncResult<()> {
        event.validate()?;
        let _guard = self.lock()?;
        ensure_unique_identities(event, &self.all_events()?)?;
        write_json(&self.event_path(&event.id), event, false)
    }

    fn delete_event(&self, id: &str) -> CalSyncResult<bool> {
        let _guard = self.lock()?;
        remove_if_exists(&self.event_path(id))
    }

    fn events_by_owner(&self, owner: &str) -> CalSyncResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .all_events()?
            .into_iter()
            .filter(|e| e.owner == owner)
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }
}

impl CredentialStore for FileStore {
    fn get_credential(&self, user: &str, provider: Provider) -> CalSyncResult<Option<Credential>> {
        read_optional(&self.credential_path(user, provider))
    }

    fn put_credential(&self, credential: &Credential) -> CalSyncResult<()> {
        let _guard = self.lock()?;
        write_json(
            &self.credential_path(&credential.user, credential.provider),
            credential,
            true,
        )
    }

    fn delete_credential(&self, user: &str, provider: Provider) -> CalSyncResult<bool> {
        let _guard = self.lock()?;
        remove_if_exists(&self.credential_path(user, provider))
    }
}
