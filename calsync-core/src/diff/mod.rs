//! Reconciliation between local events and a remote source.

mod event_diff;
mod policy;
mod sync_plan;

pub use event_diff::{DiffKind, EventDiff};
pub use policy::{ConflictPolicy, DeletionFuse};
pub use sync_plan::{DuplicateLink, ReconcileOptions, RejectedRemote, SyncPlan};
