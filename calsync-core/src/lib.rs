//! Core engine for calsync.
//!
//! This crate holds everything that does not talk to a concrete provider:
//! - `Event`, `RemoteEvent` and `Credential` records
//! - the feed codec (`ics`) for one-way export/import
//! - reconciliation (`diff`) between local events and a remote window
//! - the token lifecycle (`auth`) and the gateway seam (`remote`)
//! - `SyncService`, which exposes the operations a request layer calls

pub mod auth;
pub mod constants;
pub mod credential;
pub mod diff;
pub mod error;
pub mod event;
pub mod ics;
pub mod remote;
pub mod store;
pub mod sync;
pub mod window;

pub use credential::{Credential, Provider, TokenGrant, TokenState};
pub use error::{CalSyncError, CalSyncResult};
pub use event::{Event, RemoteEvent};
pub use sync::{ImportReport, SyncOptions, SyncReport, SyncService, SyncStatus};
pub use window::SyncWindow;
