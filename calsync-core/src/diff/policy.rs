//! Knobs that decide how reconciliation resolves disagreements.

use serde::{Deserialize, Serialize};

/// Which side wins when a linked event differs between local and remote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The remote record overwrites local fields. Concurrent local edits to
    /// linked events are lost.
    #[default]
    RemoteWins,
}

/// Guards against mass deletion when a listing comes back short.
///
/// A remote listing that silently under-returns looks exactly like the user
/// deleting those events remotely. When the share of linked in-window events
/// missing from the listing is large, deletions are skipped for that run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletionFuse {
    /// Fewer missing events than this never trip the fuse.
    pub min_missing: usize,
    /// Fraction of linked in-window events that must be missing to trip.
    pub max_missing_ratio: f64,
}

impl Default for DeletionFuse {
    fn default() -> Self {
        DeletionFuse {
            min_missing: 10,
            max_missing_ratio: 0.5,
        }
    }
}

impl DeletionFuse {
    /// A fuse that never trips.
    pub fn disabled() -> Self {
        DeletionFuse {
            min_missing: usize::MAX,
            max_missing_ratio: 1.0,
        }
    }

    pub fn trips(&self, missing: usize, linked_in_window: usize) -> bool {
        if missing == 0 || missing < self.min_missing || linked_in_window == 0 {
            return false;
        }
        missing as f64 / linked_in_window as f64 >= self.max_missing_ratio
    }
}
