//! Reconciliation: what must change so local and remote agree.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::credential::Provider;
use crate::diff::{ConflictPolicy, DeletionFuse, EventDiff};
use crate::event::{Event, RemoteEvent};
use crate::window::SyncWindow;

/// Settings reconciliation needs from the caller.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub policy: ConflictPolicy,
    pub fuse: DeletionFuse,
    /// Color for events materialized from the remote side
    pub default_color: String,
}

/// A remote record that failed validation and was left out.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRemote {
    pub id: String,
    pub reason: String,
}

/// Several local events claiming one remote identity. Nothing is done for
/// that identity until the conflict is resolved by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateLink {
    pub identity: String,
    pub event_ids: Vec<String>,
}

/// Everything one reconciliation pass decided.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub provider: Provider,
    /// Local store changes, in step order
    pub to_pull: Vec<EventDiff>,
    /// Unlinked in-window events to create remotely
    pub to_push: Vec<Event>,
    pub rejected: Vec<RejectedRemote>,
    pub duplicates: Vec<DuplicateLink>,
    /// Linked events already equal to their remote record
    pub unchanged: usize,
    pub deletions_suppressed: bool,
}

impl SyncPlan {
    fn empty(provider: Provider) -> Self {
        SyncPlan {
            provider,
            to_pull: Vec::new(),
            to_push: Vec::new(),
            rejected: Vec::new(),
            duplicates: Vec::new(),
            unchanged: 0,
            deletions_suppressed: false,
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.to_pull.is_empty() && self.to_push.is_empty()
    }

    /// Two-way reconciliation of one user's events against a remote window.
    ///
    /// Steps, in order: partition local events by link, index the remote
    /// listing, update or delete linked events, materialize or adopt
    /// unreferenced remote records, then queue unlinked in-window events
    /// for creation on the remote side.
    pub fn compute(
        provider: Provider,
        owner: &str,
        local: Vec<Event>,
        remote: Vec<RemoteEvent>,
        window: &SyncWindow,
        options: &ReconcileOptions,
    ) -> Self {
        let mut plan = SyncPlan::empty(provider);

        // 1. Partition
        let (linked, mut unlinked, duplicated) = partition(provider, local, &mut plan);

        // 2. Index the listing
        let (remote_by_id, remote_order, present) = index_remote(remote, &mut plan);

        // 3. Linked events: remote wins, or the remote copy is gone
        let mut linked_events: Vec<(&String, &Event)> = linked.iter().collect();
        linked_events.sort_by_key(|(_, e)| e.start);

        let mut missing = Vec::new();
        let mut linked_in_window = 0;

        for (identity, local) in linked_events {
            let in_window = window.intersects(local.start, local.end);
            if in_window {
                linked_in_window += 1;
            }

            match remote_by_id.get(identity) {
                Some(remote) => plan.reconcile_linked(local, remote, options.policy),
                // Rejected records still exist remotely
                None if present.contains(identity) => {}
                None if in_window => missing.push(local.clone()),
                // Outside the window the listing says nothing about it
                None => {}
            }
        }

        if options.fuse.trips(missing.len(), linked_in_window) {
            warn!(
                provider = %provider,
                missing = missing.len(),
                linked = linked_in_window,
                "Remote listing is missing too many linked events, skipping deletions"
            );
            plan.deletions_suppressed = true;
        } else {
            plan.to_pull.extend(missing.into_iter().map(EventDiff::Delete));
        }

        // 4. Unreferenced remote records
        let mut creations = Vec::new();
        for id in &remote_order {
            if linked.contains_key(id.as_str()) || duplicated.contains(id.as_str()) {
                continue;
            }
            let Some(remote) = remote_by_id.get(id.as_str()) else {
                continue;
            };

            // A record this engine created earlier but never got to link
            let adoptable = remote
                .origin_id
                .as_deref()
                .and_then(|origin| unlinked.remove(origin));

            match adoptable {
                Some(old) => {
                    debug!(provider = %provider, remote_id = %id, event_id = %old.id, "Adopting remote record");
                    let mut new = old.clone();
                    new.set_identity_for(provider, id);
                    new.apply_remote(remote);
                    if let Some(diff) = EventDiff::get_diff(old, new) {
                        plan.to_pull.push(diff);
                    }
                }
                None => {
                    let mut event = Event::from_remote(owner, remote, &options.default_color);
                    event.set_identity_for(provider, id);
                    creations.push(EventDiff::Create(event));
                }
            }
        }
        plan.to_pull.extend(creations);

        // 5. Push what is still unlinked
        let mut to_push: Vec<Event> = unlinked
            .into_values()
            .filter(|e| window.intersects(e.start, e.end))
            .collect();
        to_push.sort_by_key(|e| e.start);
        plan.to_push = to_push;

        plan
    }

    /// One-way import: upsert each decoded record by its UID. There are no
    /// deletions and nothing is pushed.
    pub fn for_import(
        owner: &str,
        local: Vec<Event>,
        decoded: Vec<RemoteEvent>,
        options: &ReconcileOptions,
    ) -> Self {
        let provider = Provider::Ical;
        let mut plan = SyncPlan::empty(provider);

        let (linked, _unlinked, duplicated) = partition(provider, local, &mut plan);

        for remote in decoded {
            if let Err(e) = remote.validate() {
                plan.rejected.push(RejectedRemote {
                    id: remote.id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            if duplicated.contains(remote.id.as_str()) {
                continue;
            }

            match linked.get(remote.id.as_str()) {
                Some(local) => plan.reconcile_linked(local, &remote, options.policy),
                None => {
                    let mut event = Event::from_remote(owner, &remote, &options.default_color);
                    event.set_identity_for(provider, &remote.id);
                    plan.to_pull.push(EventDiff::Create(event));
                }
            }
        }

        plan
    }

    fn reconcile_linked(&mut self, local: &Event, remote: &RemoteEvent, policy: ConflictPolicy) {
        if local.matches_remote(remote) {
            self.unchanged += 1;
            return;
        }

        match policy {
            ConflictPolicy::RemoteWins => {
                let mut new = local.clone();
                new.apply_remote(remote);
                if let Some(diff) = EventDiff::get_diff(local.clone(), new) {
                    self.to_pull.push(diff);
                }
            }
        }
    }
}

type Linked = HashMap<String, Event>;
type Unlinked = HashMap<String, Event>;

/// Split local events into linked (by identity) and unlinked (by local id).
/// Identities claimed by more than one event are reported and left out of
/// both maps.
fn partition(
    provider: Provider,
    local: Vec<Event>,
    plan: &mut SyncPlan,
) -> (Linked, Unlinked, HashSet<String>) {
    let mut by_identity: HashMap<String, Vec<Event>> = HashMap::new();
    let mut unlinked = HashMap::new();

    for event in local {
        match event.identity_for(provider) {
            Some(identity) => by_identity
                .entry(identity.to_string())
                .or_default()
                .push(event),
            None => {
                unlinked.insert(event.id.clone(), event);
            }
        }
    }

    let mut linked = HashMap::new();
    let mut duplicated = HashSet::new();

    for (identity, mut events) in by_identity {
        if events.len() == 1 {
            if let Some(event) = events.pop() {
                linked.insert(identity, event);
            }
            continue;
        }

        let mut event_ids: Vec<String> = events.into_iter().map(|e| e.id).collect();
        event_ids.sort();
        warn!(
            provider = %provider,
            identity = %identity,
            events = ?event_ids,
            "Several local events share one remote identity"
        );
        plan.duplicates.push(DuplicateLink {
            identity: identity.clone(),
            event_ids,
        });
        duplicated.insert(identity);
    }

    plan.duplicates.sort_by(|a, b| a.identity.cmp(&b.identity));
    (linked, unlinked, duplicated)
}

/// Index a listing by id, keeping the first record for a repeated id.
/// Returns the index, the listing order, and every id seen (valid or not).
fn index_remote(
    remote: Vec<RemoteEvent>,
    plan: &mut SyncPlan,
) -> (HashMap<String, RemoteEvent>, Vec<String>, HashSet<String>) {
    let mut by_id = HashMap::new();
    let mut order = Vec::new();
    let mut present = HashSet::new();

    for record in remote {
        present.insert(record.id.clone());

        if let Err(e) = record.validate() {
            debug!(remote_id = %record.id, error = %e, "Rejecting remote record");
            plan.rejected.push(RejectedRemote {
                id: record.id.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        if by_id.contains_key(&record.id) {
            debug!(remote_id = %record.id, "Repeated id in listing, keeping the first");
            continue;
        }

        order.push(record.id.clone());
        by_id.insert(record.id.clone(), record);
    }

    (by_id, order, present)
}
