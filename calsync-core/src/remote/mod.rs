//! Gateways to the remote side of a sync.
//!
//! The two providers share almost nothing, so they are variants of
//! [`Gateway`] rather than implementations of one wide trait. Asking a
//! variant for a capability it lacks returns [`CalSyncError::Unsupported`].

mod feed;

pub use feed::FeedGateway;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::credential::{Credential, Provider};
use crate::error::{CalSyncError, CalSyncResult};
use crate::event::{Event, RemoteEvent};
use crate::ics::DecodedFeed;
use crate::window::SyncWindow;

/// A two-way calendar reachable with an OAuth credential.
#[async_trait]
pub trait RemoteCalendar: Send + Sync {
    fn provider(&self) -> Provider;

    /// Every event intersecting `window`. Implementations must follow
    /// pagination to the end before returning.
    async fn list(&self, credential: &Credential, window: &SyncWindow)
    -> CalSyncResult<Vec<RemoteEvent>>;

    /// Create `event` remotely and return the provider's id for it.
    async fn create(&self, credential: &Credential, event: &Event) -> CalSyncResult<String>;
}

pub enum Gateway<'a> {
    TwoWay(&'a dyn RemoteCalendar),
    Feed(FeedGateway),
}

impl<'a> Gateway<'a> {
    pub fn provider(&self) -> Provider {
        match self {
            Gateway::TwoWay(remote) => remote.provider(),
            Gateway::Feed(_) => Provider::Ical,
        }
    }

    pub async fn list(
        &self,
        credential: &Credential,
        window: &SyncWindow,
    ) -> CalSyncResult<Vec<RemoteEvent>> {
        match self {
            Gateway::TwoWay(remote) => remote.list(credential, window).await,
            Gateway::Feed(_) => Err(self.unsupported("list")),
        }
    }

    pub async fn create(&self, credential: &Credential, event: &Event) -> CalSyncResult<String> {
        match self {
            Gateway::TwoWay(remote) => remote.create(credential, event).await,
            Gateway::Feed(_) => Err(self.unsupported("create")),
        }
    }

    pub fn encode(&self, events: &[Event]) -> CalSyncResult<String> {
        match self {
            Gateway::Feed(feed) => feed.encode(events),
            Gateway::TwoWay(_) => Err(self.unsupported("encode")),
        }
    }

    pub fn decode(&self, text: &str) -> CalSyncResult<DecodedFeed> {
        match self {
            Gateway::Feed(feed) => feed.decode(text),
            Gateway::TwoWay(_) => Err(self.unsupported("decode")),
        }
    }

    fn unsupported(&self, operation: &'static str) -> CalSyncError {
        CalSyncError::Unsupported {
            provider: self.provider(),
            operation,
        }
    }
}

/// Bound a remote call. An elapsed timer is a transient failure.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> CalSyncResult<T>
where
    F: Future<Output = CalSyncResult<T>>,
{
    timeout(limit, call).await.map_err(|_| {
        CalSyncError::RemoteUnavailable(format!(
            "no response after {} seconds",
            limit.as_secs()
        ))
    })?
}
