//! Calendar API wire types and conversion to and from engine records.

use std::collections::HashMap;

use calsync_core::constants::UNTITLED;
use calsync_core::{Event, RemoteEvent};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Private extended property holding the local id of the event we pushed.
pub const ORIGIN_PROPERTY: &str = "calsync_local_id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventsPage {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<EventDateTime>,
    #[serde(default)]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ExtendedProperties {
    #[serde(default)]
    pub private: HashMap<String, String>,
}

impl GoogleEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Why this record has no usable time range, if it has none.
    pub fn missing_times(&self) -> Option<&'static str> {
        let start = self.start.as_ref().and_then(EventDateTime::to_utc);
        let end = self.end.as_ref().and_then(EventDateTime::to_utc);
        match (start, end) {
            (None, None) => Some("no start or end time"),
            (None, Some(_)) => Some("no start time"),
            (Some(_), None) => Some("no end time"),
            (Some(_), Some(_)) => None,
        }
    }

    /// Convert to the engine's view. Validation happens during
    /// reconciliation.
    ///
    /// A record missing a time still comes through so its id counts as
    /// present: the missing side takes the other side's value, giving an
    /// empty range that validation rejects.
    pub fn into_remote(self) -> RemoteEvent {
        let start = self.start.as_ref().and_then(EventDateTime::to_utc);
        let end = self.end.as_ref().and_then(EventDateTime::to_utc);
        let ((start, all_day), (end, _)) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, start),
            (None, Some(end)) => (end, end),
            (None, None) => ((DateTime::<Utc>::UNIX_EPOCH, false), (DateTime::<Utc>::UNIX_EPOCH, false)),
        };

        let origin_id = self
            .extended_properties
            .and_then(|mut p| p.private.remove(ORIGIN_PROPERTY));

        let title = if self.summary.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            self.summary
        };

        RemoteEvent {
            id: self.id,
            title,
            description: self.description.filter(|d| !d.is_empty()),
            start,
            end,
            all_day,
            origin_id,
        }
    }

    /// Insert body for a local event, stamped with its local id.
    pub fn for_insert(event: &Event) -> Self {
        let mut private = HashMap::new();
        private.insert(ORIGIN_PROPERTY.to_string(), event.id.clone());

        GoogleEvent {
            summary: event.title.clone(),
            description: event.description.clone(),
            start: Some(EventDateTime::from_utc(event.start, event.all_day)),
            end: Some(EventDateTime::from_utc(event.end, event.all_day)),
            extended_properties: Some(ExtendedProperties { private }),
            ..GoogleEvent::default()
        }
    }
}

impl EventDateTime {
    fn from_utc(dt: DateTime<Utc>, all_day: bool) -> Self {
        if all_day {
            EventDateTime {
                date: Some(dt.date_naive()),
                ..EventDateTime::default()
            }
        } else {
            EventDateTime {
                date_time: Some(dt.fixed_offset()),
                time_zone: Some("UTC".to_string()),
                ..EventDateTime::default()
            }
        }
    }

    /// Instant in UTC and whether it was a bare date. Dates are read as
    /// midnight UTC; Google's all-day end dates are already exclusive.
    fn to_utc(&self) -> Option<(DateTime<Utc>, bool)> {
        if let Some(dt) = self.date_time {
            Some((dt.with_timezone(&Utc), false))
        } else {
            self.date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| (dt.and_utc(), true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_all_day_event_from_google() {
        let json = r#"{
            "id": "g1",
            "status": "confirmed",
            "summary": "Holiday",
            "start": {"date": "2025-01-06"},
            "end": {"date": "2025-01-07"}
        }"#;
        let event: GoogleEvent = serde_json::from_str(json).unwrap();

        let remote = event.into_remote();

        assert!(remote.all_day);
        assert_eq!(remote.start, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap());
        assert_eq!(remote.end, Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap());
        assert_eq!(remote.description, None);
    }

    #[test]
    fn test_offset_times_are_normalized_and_origin_read() {
        let json = r#"{
            "id": "g2",
            "summary": "Call",
            "description": "",
            "start": {"dateTime": "2025-01-06T10:00:00+01:00", "timeZone": "Europe/Berlin"},
            "end": {"dateTime": "2025-01-06T11:00:00+01:00"},
            "extendedProperties": {"private": {"calsync_local_id": "local-7"}}
        }"#;
        let event: GoogleEvent = serde_json::from_str(json).unwrap();

        let remote = event.into_remote();

        assert!(!remote.all_day);
        assert_eq!(remote.start, Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap());
        assert_eq!(remote.origin_id.as_deref(), Some("local-7"));
    }

    #[test]
    fn test_missing_end_still_converts_but_fails_validation() {
        let json = r#"{
            "id": "g3",
            "summary": "Standup",
            "start": {"dateTime": "2025-01-06T09:00:00Z"}
        }"#;
        let event: GoogleEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.missing_times(), Some("no end time"));
        let remote = event.into_remote();

        assert_eq!(remote.id, "g3");
        assert_eq!(remote.start, remote.end);
        assert!(remote.validate().is_err());
    }

    #[test]
    fn test_missing_summary_gets_placeholder_title() {
        let json = r#"{
            "id": "g4",
            "start": {"dateTime": "2025-01-06T09:00:00Z"},
            "end": {"dateTime": "2025-01-06T10:00:00Z"}
        }"#;
        let event: GoogleEvent = serde_json::from_str(json).unwrap();

        let remote = event.into_remote();

        assert_eq!(remote.title, "(No title)");
        assert!(remote.validate().is_ok());
    }

    #[test]
    fn test_insert_body_carries_origin() {
        let event = Event::new(
            "alice",
            "Standup",
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
        );

        let body = serde_json::to_value(GoogleEvent::for_insert(&event)).unwrap();

        assert_eq!(body["summary"], "Standup");
        assert_eq!(body["start"]["dateTime"], "2025-01-06T09:00:00+00:00");
        assert_eq!(body["extendedProperties"]["private"][ORIGIN_PROPERTY], event.id.as_str());
        assert!(body.get("id").is_none());
    }
}
