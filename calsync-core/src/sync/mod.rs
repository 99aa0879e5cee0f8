//! The operations a request layer calls.

mod lock;
mod options;
mod report;

pub use lock::{SyncGuard, SyncLocks};
pub use options::SyncOptions;
pub use report::{DuplicateReport, EventFailure, ImportReport, SyncReport, SyncStatus};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::auth::{OAuthFlow, TokenManager};
use crate::credential::{Credential, Provider, TokenState};
use crate::diff::{EventDiff, RejectedRemote, SyncPlan};
use crate::error::{CalSyncError, CalSyncResult};
use crate::event::Event;
use crate::remote::{FeedGateway, Gateway, RemoteCalendar, with_timeout};
use crate::store::{CredentialStore, EventStore};
use crate::window::SyncWindow;

/// Counts of local writes applied from a plan.
#[derive(Debug, Default)]
struct Applied {
    created: usize,
    updated: usize,
    deleted: usize,
    failures: Vec<EventFailure>,
}

pub struct SyncService {
    events: Arc<dyn EventStore>,
    credentials: Arc<dyn CredentialStore>,
    options: SyncOptions,
    locks: SyncLocks,
}

impl SyncService {
    pub fn new(
        events: Arc<dyn EventStore>,
        credentials: Arc<dyn CredentialStore>,
        options: SyncOptions,
    ) -> Self {
        SyncService {
            events,
            credentials,
            options,
            locks: SyncLocks::new(),
        }
    }

    /// Consent URL for a two-way provider.
    pub fn initiate_auth(&self, oauth: &dyn OAuthFlow, state: Option<&str>) -> CalSyncResult<String> {
        let provider = oauth.provider();
        if !provider.is_two_way() {
            return Err(CalSyncError::Unsupported {
                provider,
                operation: "initiate_auth",
            });
        }
        oauth.authorization_url(state)
    }

    /// Exchange a one-time authorization code and store the credential.
    ///
    /// Replaces any existing credential for the pair. If the provider sends
    /// no refresh token, the previously stored one is kept.
    #[instrument(skip(self, oauth, code), fields(provider = %oauth.provider()))]
    pub async fn complete_auth(
        &self,
        user: &str,
        oauth: &dyn OAuthFlow,
        code: &str,
    ) -> CalSyncResult<Credential> {
        let provider = oauth.provider();
        if !provider.is_two_way() {
            return Err(CalSyncError::Unsupported {
                provider,
                operation: "complete_auth",
            });
        }

        let grant = with_timeout(self.options.remote_timeout, oauth.exchange_code(code)).await?;
        let mut credential = Credential::from_grant(user, provider, &grant, Utc::now());

        if !credential.has_refresh_token() {
            if let Some(previous) = self.credentials.get_credential(user, provider)? {
                credential.refresh_token = previous.refresh_token;
            }
        }
        if !credential.has_refresh_token() {
            warn!("Provider issued no refresh token; the connection ends when the access token expires");
        }

        self.credentials.put_credential(&credential)?;
        info!("Connected");
        Ok(credential)
    }

    /// Two-way sync of `user`'s events with `remote` over the current window.
    ///
    /// Local changes are committed record by record as they are applied, so
    /// a failure partway through keeps whatever was already written. The
    /// credential's last-sync time advances once every push has settled.
    #[instrument(skip(self, remote, oauth), fields(provider = %remote.provider()))]
    pub async fn run_sync(
        &self,
        user: &str,
        remote: &dyn RemoteCalendar,
        oauth: &dyn OAuthFlow,
    ) -> CalSyncResult<SyncReport> {
        let gateway = Gateway::TwoWay(remote);
        let provider = gateway.provider();

        let _guard = self
            .locks
            .try_acquire(user, provider)
            .ok_or_else(|| CalSyncError::SyncInProgress {
                user: user.to_string(),
                provider,
            })?;

        let credential = self
            .credentials
            .get_credential(user, provider)?
            .ok_or(CalSyncError::NotConnected(provider))?;

        let now = Utc::now();
        let window = SyncWindow::at(now);

        let tokens = TokenManager::new(self.credentials.as_ref(), oauth, self.options.remote_timeout);
        let credential = tokens.ensure_valid(credential, now).await?;

        let listing = with_timeout(self.options.remote_timeout, gateway.list(&credential, &window)).await?;
        debug!(fetched = listing.len(), from = %window.from, to = %window.to, "Fetched remote window");

        let local = self.events.events_by_owner(user)?;
        let plan = SyncPlan::compute(
            provider,
            user,
            local,
            listing,
            &window,
            &self.options.reconcile(),
        );

        let mut report = SyncReport {
            rejected: plan.rejected.iter().map(rejected_failure).collect(),
            duplicates: plan.duplicates.iter().cloned().map(DuplicateReport::from).collect(),
            deletions_suppressed: plan.deletions_suppressed,
            ..SyncReport::default()
        };

        let applied = self.apply_pull(&plan.to_pull);
        report.created_locally = applied.created;
        report.updated_locally = applied.updated;
        report.deleted_locally = applied.deleted;
        report.store_failures = applied.failures;

        self.push(&gateway, &credential, plan.to_push, &mut report).await;

        self.mark_synced(user, provider, Utc::now())?;

        if report.has_failures() {
            warn!(
                push_failures = report.push_failures.len(),
                store_failures = report.store_failures.len(),
                rejected = report.rejected.len(),
                duplicates = report.duplicates.len(),
                "Sync finished with failures"
            );
        }
        info!(
            created = report.created_locally,
            updated = report.updated_locally,
            deleted = report.deleted_locally,
            pushed = report.pushed_to_remote,
            "Sync complete"
        );

        Ok(report)
    }

    /// Feed of `user`'s events that intersect the current window.
    pub fn export_feed(&self, user: &str) -> CalSyncResult<String> {
        let window = SyncWindow::current();
        let events: Vec<Event> = self
            .events
            .events_by_owner(user)?
            .into_iter()
            .filter(|e| window.intersects(e.start, e.end))
            .collect();

        debug!(user, events = events.len(), "Exporting feed");
        Gateway::Feed(FeedGateway).encode(&events)
    }

    /// Upsert every event of an inbound feed by UID. Never deletes.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub fn import_feed(&self, user: &str, text: &str) -> CalSyncResult<ImportReport> {
        let provider = Provider::Ical;
        let _guard = self
            .locks
            .try_acquire(user, provider)
            .ok_or_else(|| CalSyncError::SyncInProgress {
                user: user.to_string(),
                provider,
            })?;

        let decoded = Gateway::Feed(FeedGateway).decode(text)?;
        let mut rejected: Vec<EventFailure> = decoded
            .rejected
            .into_iter()
            .map(|r| EventFailure {
                id: r.uid.unwrap_or_else(|| "(no uid)".to_string()),
                reason: r.reason,
            })
            .collect();

        let local = self.events.events_by_owner(user)?;
        let plan = SyncPlan::for_import(user, local, decoded.events, &self.options.reconcile());
        rejected.extend(plan.rejected.iter().map(rejected_failure));

        let applied = self.apply_pull(&plan.to_pull);
        self.mark_synced(user, provider, Utc::now())?;

        let report = ImportReport {
            created: applied.created,
            updated: applied.updated,
            unchanged: plan.unchanged,
            rejected,
            store_failures: applied.failures,
            duplicates: plan.duplicates.into_iter().map(DuplicateReport::from).collect(),
        };
        info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            rejected = report.rejected.len(),
            "Import complete"
        );
        Ok(report)
    }

    /// Remove the stored credential. Succeeds when none exists.
    pub fn disconnect(&self, user: &str, provider: Provider) -> CalSyncResult<()> {
        if self.credentials.delete_credential(user, provider)? {
            info!(user, provider = %provider, "Disconnected");
        } else {
            debug!(user, provider = %provider, "Nothing to disconnect");
        }
        Ok(())
    }

    /// Connection state for every provider.
    pub fn sync_status(&self, user: &str) -> CalSyncResult<Vec<SyncStatus>> {
        let now = Utc::now();
        Provider::ALL
            .into_iter()
            .map(|provider| {
                let status = match self.credentials.get_credential(user, provider)? {
                    Some(credential) => SyncStatus {
                        provider,
                        connected: true,
                        active: credential.active,
                        state: credential.state(now),
                        last_synced_at: credential.last_synced_at,
                    },
                    None => SyncStatus {
                        provider,
                        connected: false,
                        active: false,
                        state: TokenState::Unlinked,
                        last_synced_at: None,
                    },
                };
                Ok(status)
            })
            .collect()
    }

    fn apply_pull(&self, diffs: &[EventDiff]) -> Applied {
        let mut applied = Applied::default();

        for diff in diffs {
            debug!(change = %diff, "Applying");
            let result = match diff {
                EventDiff::Create(event) => self.events.put_event(event).map(|_| applied.created += 1),
                EventDiff::Update { new, .. } => self.events.put_event(new).map(|_| applied.updated += 1),
                EventDiff::Delete(event) => self.events.delete_event(&event.id).map(|removed| {
                    if removed {
                        applied.deleted += 1;
                    }
                }),
            };

            if let Err(e) = result {
                warn!(event_id = %diff.event().id, error = %e, "Local write failed");
                applied.failures.push(EventFailure {
                    id: diff.event().id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        applied
    }

    async fn push(
        &self,
        gateway: &Gateway<'_>,
        credential: &Credential,
        events: Vec<Event>,
        report: &mut SyncReport,
    ) {
        if events.is_empty() {
            return;
        }
        let provider = gateway.provider();
        let limit = self.options.remote_timeout;

        let results: Vec<(Event, CalSyncResult<String>)> = stream::iter(events)
            .map(|event| async move {
                let result = with_timeout(limit, gateway.create(credential, &event)).await;
                (event, result)
            })
            .buffer_unordered(self.options.push_concurrency.max(1))
            .collect()
            .await;

        for (event, result) in results {
            let linked = result.and_then(|remote_id| self.link(&event, provider, &remote_id));
            match linked {
                Ok(()) => report.pushed_to_remote += 1,
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "Push failed");
                    report.push_failures.push(EventFailure {
                        id: event.id,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Attach a freshly created remote id to the current version of `event`.
    fn link(&self, event: &Event, provider: Provider, remote_id: &str) -> CalSyncResult<()> {
        match self.events.get_event(&event.id)? {
            Some(mut current) => {
                current.set_identity_for(provider, remote_id);
                self.events.put_event(&current)
            }
            // Deleted locally while the push was in flight. The remote copy
            // carries the local id and is picked up by the next sync.
            None => {
                warn!(event_id = %event.id, remote_id, "Event vanished before it could be linked");
                Ok(())
            }
        }
    }

    fn mark_synced(&self, user: &str, provider: Provider, at: DateTime<Utc>) -> CalSyncResult<()> {
        let credential = match self.credentials.get_credential(user, provider)? {
            Some(credential) => credential,
            None if provider == Provider::Ical => Credential::status_record(user, provider),
            // Disconnected mid-sync
            None => return Ok(()),
        };

        self.credentials.put_credential(&Credential {
            last_synced_at: Some(at),
            ..credential
        })
    }
}

fn rejected_failure(rejected: &RejectedRemote) -> EventFailure {
    EventFailure {
        id: rejected.id.clone(),
        reason: rejected.reason.clone(),
    }
}
