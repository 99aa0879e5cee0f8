use std::time::Duration;

use crate::constants::{DEFAULT_EVENT_COLOR, DEFAULT_PUSH_CONCURRENCY, DEFAULT_REMOTE_TIMEOUT_SECS};
use crate::diff::{ConflictPolicy, DeletionFuse, ReconcileOptions};

/// Tunables for [`SyncService`](crate::sync::SyncService).
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Remote creates in flight at once during a sync
    pub push_concurrency: usize,
    /// Upper bound for any single remote call
    pub remote_timeout: Duration,
    pub deletion_fuse: DeletionFuse,
    pub conflict_policy: ConflictPolicy,
    /// Color for events materialized from a remote or a feed
    pub default_color: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            push_concurrency: DEFAULT_PUSH_CONCURRENCY,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            deletion_fuse: DeletionFuse::default(),
            conflict_policy: ConflictPolicy::default(),
            default_color: DEFAULT_EVENT_COLOR.to_string(),
        }
    }
}

impl SyncOptions {
    pub fn reconcile(&self) -> ReconcileOptions {
        ReconcileOptions {
            policy: self.conflict_policy,
            fuse: self.deletion_fuse,
            default_color: self.default_color.clone(),
        }
    }
}
