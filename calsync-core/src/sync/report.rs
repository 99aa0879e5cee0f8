use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::credential::{Provider, TokenState};
use crate::diff::DuplicateLink;

/// Why one event could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFailure {
    /// Local event id, or the remote id / UID for rejected records
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub identity: String,
    pub event_ids: Vec<String>,
}

impl From<DuplicateLink> for DuplicateReport {
    fn from(link: DuplicateLink) -> Self {
        DuplicateReport {
            identity: link.identity,
            event_ids: link.event_ids,
        }
    }
}

/// Outcome of one two-way sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub created_locally: usize,
    pub updated_locally: usize,
    pub deleted_locally: usize,
    pub pushed_to_remote: usize,
    /// Local events the remote side did not accept
    pub push_failures: Vec<EventFailure>,
    /// Local writes that failed
    pub store_failures: Vec<EventFailure>,
    /// Remote records that failed validation
    pub rejected: Vec<EventFailure>,
    pub duplicates: Vec<DuplicateReport>,
    pub deletions_suppressed: bool,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.push_failures.is_empty()
            || !self.store_failures.is_empty()
            || !self.rejected.is_empty()
            || !self.duplicates.is_empty()
    }

    pub fn is_noop(&self) -> bool {
        self.created_locally == 0
            && self.updated_locally == 0
            && self.deleted_locally == 0
            && self.pushed_to_remote == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted locally; {} pushed to remote",
            self.created_locally, self.updated_locally, self.deleted_locally, self.pushed_to_remote
        )?;
        if self.deletions_suppressed {
            write!(f, " (deletions suppressed)")?;
        }
        Ok(())
    }
}

/// Outcome of one feed import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Components that were malformed or failed validation
    pub rejected: Vec<EventFailure>,
    pub store_failures: Vec<EventFailure>,
    pub duplicates: Vec<DuplicateReport>,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged",
            self.created, self.updated, self.unchanged
        )
    }
}

/// Connection state of one provider for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub provider: Provider,
    pub connected: bool,
    pub active: bool,
    #[serde(serialize_with = "serialize_state")]
    pub state: TokenState,
    pub last_synced_at: Option<DateTime<Utc>>,
}

fn serialize_state<S: serde::Serializer>(state: &TokenState, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(state)
}
