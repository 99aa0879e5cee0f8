//! Feed parsing using the icalendar crate's parser.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::parser::{Component, Property, read_calendar, unfold};
use tracing::debug;

use crate::constants::UNTITLED;
use crate::error::{CalSyncError, CalSyncResult};
use crate::event::{RemoteEvent, normalize_description};

/// Result of decoding one inbound feed.
#[derive(Debug, Default)]
pub struct DecodedFeed {
    pub events: Vec<RemoteEvent>,
    /// Components that could not be turned into an event at all.
    pub rejected: Vec<RejectedComponent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedComponent {
    pub uid: Option<String>,
    pub reason: String,
}

/// Decode every VEVENT in `text`.
///
/// Fails only when the text is not a calendar at all. Individual components
/// that lack a UID or a readable DTSTART are reported in `rejected`. When a
/// UID occurs more than once the last component wins.
pub fn decode(text: &str) -> CalSyncResult<DecodedFeed> {
    let unfolded = unfold(text);
    let calendar =
        read_calendar(&unfolded).map_err(|e| CalSyncError::FeedParse(e.to_string()))?;

    let mut feed = DecodedFeed::default();
    let mut position: HashMap<String, usize> = HashMap::new();

    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match parse_component(component) {
            Ok(event) => match position.get(&event.id) {
                Some(&idx) => {
                    debug!(uid = %event.id, "Duplicate UID in feed, keeping the later component");
                    feed.events[idx] = event;
                }
                None => {
                    position.insert(event.id.clone(), feed.events.len());
                    feed.events.push(event);
                }
            },
            Err(rejected) => feed.rejected.push(rejected),
        }
    }

    Ok(feed)
}

fn parse_component(vevent: &Component) -> Result<RemoteEvent, RejectedComponent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| RejectedComponent {
            uid: None,
            reason: "component has no UID".into(),
        })?;

    let reject = |reason: String| RejectedComponent {
        uid: Some(uid.clone()),
        reason,
    };

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| reject("component has no DTSTART".into()))?;
    let (start, all_day) = parse_time(dtstart).map_err(reject)?;

    let end = match vevent.find_prop("DTEND") {
        Some(prop) => parse_time(prop).map_err(reject)?.0,
        // RFC 5545: a date-only start with no end lasts one day
        None if all_day => start + Duration::days(1),
        None => start,
    };

    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| UNTITLED.to_string());

    // TEXT values arrive already unescaped from the parser
    let description = normalize_description(vevent.find_prop("DESCRIPTION").map(|p| p.val.to_string()));

    Ok(RemoteEvent {
        id: uid,
        title,
        description,
        start,
        end,
        all_day,
        origin_id: None,
    })
}

/// Parse DTSTART/DTEND into a UTC instant and whether the value is date-only.
///
/// A value is all-day exactly when it has no time-of-day part, i.e. no 'T'.
/// Handles:
/// - Dates: `DTSTART;VALUE=DATE:20250106`
/// - UTC: `DTSTART:20250106T090000Z`
/// - Zoned: `DTSTART;TZID=Europe/Berlin:20250106T100000`
/// - Floating: `DTSTART:20250106T090000` (read as UTC)
fn parse_time(prop: &Property) -> Result<(DateTime<Utc>, bool), String> {
    let raw = prop.val.as_ref().trim();

    if !raw.contains('T') {
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d")
            .map_err(|_| format!("invalid date '{}'", raw))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date '{}'", raw))?;
        return Ok((midnight.and_utc(), true));
    }

    let (local, is_utc) = match raw.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (raw, false),
    };
    let naive = NaiveDateTime::parse_from_str(local, "%Y%m%dT%H%M%S")
        .map_err(|_| format!("invalid date-time '{}'", raw))?;

    if is_utc {
        return Ok((naive.and_utc(), false));
    }

    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    match tzid {
        Some(tzid) => {
            let tz: Tz = tzid
                .trim_matches('"')
                .parse()
                .map_err(|_| format!("unknown time zone '{}'", tzid))?;
            let zoned = tz
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| format!("'{}' does not exist in {}", raw, tzid))?;
            Ok((zoned.with_timezone(&Utc), false))
        }
        None => Ok((naive.and_utc(), false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n{}END:VCALENDAR\r\n",
            body
        )
    }

    #[test]
    fn test_date_only_start_is_all_day() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             UID:holiday-1\r\n\
             DTSTART;VALUE=DATE:20250106\r\n\
             DTEND;VALUE=DATE:20250107\r\n\
             SUMMARY:Holiday\r\n\
             END:VEVENT\r\n",
        );

        let decoded = decode(&feed).unwrap();
        let event = &decoded.events[0];

        assert!(event.all_day);
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_properties_in_any_order() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             SUMMARY:Review\r\n\
             DTEND:20250106T110000Z\r\n\
             DESCRIPTION:Quarterly\r\n\
             UID:abc\r\n\
             DTSTART:20250106T100000Z\r\n\
             END:VEVENT\r\n",
        );

        let decoded = decode(&feed).unwrap();
        let event = &decoded.events[0];

        assert_eq!(event.id, "abc");
        assert_eq!(event.title, "Review");
        assert_eq!(event.description.as_deref(), Some("Quarterly"));
        assert!(!event.all_day);
    }

    #[test]
    fn test_tzid_is_converted_to_utc() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             UID:berlin\r\n\
             DTSTART;TZID=Europe/Berlin:20250106T100000\r\n\
             DTEND;TZID=Europe/Berlin:20250106T110000\r\n\
             SUMMARY:Call\r\n\
             END:VEVENT\r\n",
        );

        let decoded = decode(&feed).unwrap();
        let event = &decoded.events[0];

        // CET is UTC+1 in January
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_floating_time_is_read_as_utc() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             UID:floating\r\n\
             DTSTART:20250106T100000\r\n\
             DTEND:20250106T103000\r\n\
             SUMMARY:Floating\r\n\
             END:VEVENT\r\n",
        );

        let event = &decode(&feed).unwrap().events[0];
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_uid_or_start_is_rejected() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             DTSTART:20250106T100000Z\r\n\
             SUMMARY:No uid\r\n\
             END:VEVENT\r\n\
             BEGIN:VEVENT\r\n\
             UID:no-start\r\n\
             SUMMARY:No start\r\n\
             END:VEVENT\r\n",
        );

        let decoded = decode(&feed).unwrap();

        assert!(decoded.events.is_empty());
        assert_eq!(decoded.rejected.len(), 2);
        assert_eq!(decoded.rejected[1].uid.as_deref(), Some("no-start"));
    }

    #[test]
    fn test_duplicate_uid_keeps_last() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             UID:dup\r\n\
             DTSTART:20250106T100000Z\r\n\
             DTEND:20250106T110000Z\r\n\
             SUMMARY:First\r\n\
             END:VEVENT\r\n\
             BEGIN:VEVENT\r\n\
             UID:dup\r\n\
             DTSTART:20250107T100000Z\r\n\
             DTEND:20250107T110000Z\r\n\
             SUMMARY:Second\r\n\
             END:VEVENT\r\n",
        );

        let decoded = decode(&feed).unwrap();

        assert_eq!(decoded.events.len(), 1);
        assert_eq!(decoded.events[0].title, "Second");
    }

    #[test]
    fn test_text_values_are_unescaped_once() {
        let feed = wrap(
            "BEGIN:VEVENT\r\n\
             UID:esc\r\n\
             DTSTART:20250106T100000Z\r\n\
             DTEND:20250106T110000Z\r\n\
             SUMMARY:a\\\\b\\\\\\,c\r\n\
             DESCRIPTION:line\\nbreak\\; C:\\temp\r\n\
             END:VEVENT\r\n",
        );

        let event = &decode(&feed).unwrap().events[0];

        assert_eq!(event.title, "a\\b\\,c");
        assert_eq!(event.description.as_deref(), Some("line\nbreak; C:\\temp"));
    }
}
