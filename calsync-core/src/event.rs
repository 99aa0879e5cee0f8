//! Local and remote event types.
//!
//! `Event` is the record the local store owns. `RemoteEvent` is what a
//! gateway hands back, either from the two-way calendar API or decoded from
//! an inbound feed. Reconciliation only ever compares the fields the two
//! have in common (see [`Event::matches_remote`]).

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_EVENT_COLOR, MAX_TITLE_LEN};
use crate::credential::Provider;
use crate::error::{CalSyncError, CalSyncResult};

/// One calendar occurrence owned by exactly one local user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub color: String,

    // Provider identities, unique across all events when set
    /// Identifier assigned by the two-way calendar provider
    pub remote_id: Option<String>,
    /// UID of the feed component this event was imported from
    pub feed_uid: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// An event as seen on the remote side.
///
/// For the two-way provider `id` is the provider's event id; for a decoded
/// feed it is the component UID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    /// Local identity stamped on the remote record when this engine created it.
    #[serde(default)]
    pub origin_id: Option<String>,
}

impl Event {
    pub fn new(owner: &str, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Event {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: title.to_string(),
            description: None,
            start,
            end,
            all_day: false,
            color: DEFAULT_EVENT_COLOR.to_string(),
            remote_id: None,
            feed_uid: None,
            created_at: Utc::now(),
        }
    }

    /// Materialize a remote record as a new local event.
    pub fn from_remote(owner: &str, remote: &RemoteEvent, color: &str) -> Self {
        let mut event = Event::new(owner, &remote.title, remote.start, remote.end);
        event.description = remote.description.clone();
        event.all_day = remote.all_day;
        event.color = color.to_string();
        event
    }

    /// The identity this event carries for `provider`, if linked.
    pub fn identity_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.remote_id.as_deref(),
            Provider::Ical => self.feed_uid.as_deref(),
        }
    }

    pub fn set_identity_for(&mut self, provider: Provider, identity: &str) {
        match provider {
            Provider::Google => self.remote_id = Some(identity.to_string()),
            Provider::Ical => self.feed_uid = Some(identity.to_string()),
        }
    }

    /// True when every field a remote record carries already equals this event.
    pub fn matches_remote(&self, remote: &RemoteEvent) -> bool {
        self.title == remote.title
            && self.description == remote.description
            && self.start == remote.start
            && self.end == remote.end
            && self.all_day == remote.all_day
    }

    /// Overwrite the shared fields from a remote record. Color and identities
    /// are local-only and stay as they are.
    pub fn apply_remote(&mut self, remote: &RemoteEvent) {
        self.title = remote.title.clone();
        self.description = remote.description.clone();
        self.start = remote.start;
        self.end = remote.end;
        self.all_day = remote.all_day;
    }

    pub fn validate(&self) -> CalSyncResult<()> {
        validate_timing(&self.title, self.start, self.end, self.all_day)?;

        if self.owner.trim().is_empty() {
            return Err(CalSyncError::InvalidEvent(format!(
                "event {} has no owner",
                self.id
            )));
        }

        if !is_hex_color(&self.color) {
            return Err(CalSyncError::InvalidEvent(format!(
                "color '{}' is not of the form #RRGGBB",
                self.color
            )));
        }

        Ok(())
    }
}

impl RemoteEvent {
    pub fn validate(&self) -> CalSyncResult<()> {
        if self.id.trim().is_empty() {
            return Err(CalSyncError::InvalidEvent(
                "remote event has an empty identifier".into(),
            ));
        }
        validate_timing(&self.title, self.start, self.end, self.all_day)
    }
}

/// Treat an empty description the same as a missing one.
pub fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.is_empty())
}

fn validate_timing(
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    all_day: bool,
) -> CalSyncResult<()> {
    if title.trim().is_empty() {
        return Err(CalSyncError::InvalidEvent("title is required".into()));
    }

    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CalSyncError::InvalidEvent(format!(
            "title is longer than {} characters",
            MAX_TITLE_LEN
        )));
    }

    if end <= start {
        return Err(CalSyncError::InvalidEvent(format!(
            "'{}' ends ({}) at or before it starts ({})",
            title, end, start
        )));
    }

    if all_day && !(is_midnight(start) && is_midnight(end)) {
        return Err(CalSyncError::InvalidEvent(format!(
            "all-day event '{}' must start and end at 00:00 UTC",
            title
        )));
    }

    Ok(())
}

fn is_midnight(dt: DateTime<Utc>) -> bool {
    dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn standup() -> Event {
        Event::new(
            "alice",
            "Standup",
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let mut event = standup();
        event.end = event.start;

        let err = event.validate().unwrap_err();
        assert!(matches!(err, CalSyncError::InvalidEvent(_)), "got {err:?}");
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let mut event = standup();
        std::mem::swap(&mut event.start, &mut event.end);

        assert!(event.validate().is_err());
    }

    #[test]
    fn test_all_day_must_be_midnight_aligned() {
        let mut event = standup();
        event.all_day = true;
        assert!(event.validate().is_err());

        event.start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        event.end = Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap();
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_color_and_title_rules() {
        let mut event = standup();
        event.color = "blue".into();
        assert!(event.validate().is_err());

        let mut event = standup();
        event.title = "   ".into();
        assert!(event.validate().is_err());

        let mut event = standup();
        event.title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_apply_remote_keeps_local_only_fields() {
        let mut event = standup();
        event.color = "#ff0000".into();
        event.remote_id = Some("g1".into());

        let remote = RemoteEvent {
            id: "g1".into(),
            title: "Standup (moved)".into(),
            description: Some("room 4".into()),
            start: event.start + chrono::Duration::hours(1),
            end: event.end + chrono::Duration::hours(1),
            all_day: false,
            origin_id: None,
        };

        assert!(!event.matches_remote(&remote));
        event.apply_remote(&remote);

        assert!(event.matches_remote(&remote));
        assert_eq!(event.color, "#ff0000");
        assert_eq!(event.remote_id.as_deref(), Some("g1"));
    }

    #[test]
    fn test_identity_per_provider() {
        let mut event = standup();
        event.set_identity_for(Provider::Google, "g1");
        event.set_identity_for(Provider::Ical, "uid-1");

        assert_eq!(event.identity_for(Provider::Google), Some("g1"));
        assert_eq!(event.identity_for(Provider::Ical), Some("uid-1"));
    }
}
