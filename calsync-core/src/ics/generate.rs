//! Feed generation using the icalendar crate's builder.

use icalendar::{Calendar, Component, EventLike};

use crate::error::{CalSyncError, CalSyncResult};
use crate::event::Event;

const PRODID: &str = "-//calsync//EN";

/// Encode `events` as a VCALENDAR feed.
///
/// The UID of each component is the local event id. Every event is
/// validated first; an invalid event fails the whole export.
pub fn encode(events: &[Event]) -> CalSyncResult<String> {
    let mut cal = Calendar::empty();
    cal.append_property(("VERSION", "2.0"));
    cal.append_property(("PRODID", PRODID));
    cal.append_property(("CALSCALE", "GREGORIAN"));

    for event in events {
        event.validate()?;
        cal.push(to_vevent(event));
    }

    let cal = cal.done();
    (&cal)
        .try_into()
        .map_err(|e: std::fmt::Error| CalSyncError::Serialization(format!("Failed to write feed: {}", e)))
}

fn to_vevent(event: &Event) -> icalendar::Event {
    let mut vevent = icalendar::Event::new();
    vevent.uid(&event.id);
    vevent.timestamp(event.created_at);

    if event.all_day {
        vevent.starts(event.start.date_naive());
        vevent.ends(event.end.date_naive());
    } else {
        vevent.starts(event.start);
        vevent.ends(event.end);
    }

    vevent.summary(&normalize_line_breaks(&event.title));
    if let Some(desc) = event.description.as_deref().filter(|d| !d.is_empty()) {
        vevent.description(&normalize_line_breaks(desc));
    }

    vevent.done()
}

/// Collapse CRLF and bare CR to LF. The builder escapes backslashes, then
/// commas and semicolons, then LF; a raw CR would otherwise end the line.
fn normalize_line_breaks(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn standup() -> Event {
        let mut event = Event::new(
            "alice",
            "Standup",
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
        );
        event.id = "evt-1".into();
        event.created_at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        event
    }

    #[test]
    fn test_line_breaks_are_normalized() {
        assert_eq!(normalize_line_breaks("one\r\ntwo\nthree\rfour"), "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_encode_exact_subset() {
        let feed = encode(&[standup()]).unwrap();

        assert!(feed.starts_with(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//calsync//EN\r\n\
             CALSCALE:GREGORIAN\r\n\
             BEGIN:VEVENT\r\n"
        ));
        assert!(feed.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));

        let mut props: Vec<&str> = feed
            .split("\r\n")
            .skip_while(|l| *l != "BEGIN:VEVENT")
            .skip(1)
            .take_while(|l| *l != "END:VEVENT")
            .collect();
        props.sort();
        assert_eq!(
            props,
            vec![
                "DTEND:20250106T093000Z",
                "DTSTAMP:20250101T080000Z",
                "DTSTART:20250106T090000Z",
                "SUMMARY:Standup",
                "UID:evt-1",
            ]
        );
    }

    #[test]
    fn test_encode_escapes_text() {
        let mut event = standup();
        event.title = "a,b;c\\d".into();
        event.description = Some("one\r\ntwo".into());

        let feed = encode(&[event]).unwrap();

        assert!(feed.contains("SUMMARY:a\\,b\\;c\\\\d\r\n"), "{feed}");
        assert!(feed.contains("DESCRIPTION:one\\ntwo\r\n"), "{feed}");
    }

    #[test]
    fn test_all_day_uses_date_values() {
        let mut event = standup();
        event.start = Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap();
        event.end = Utc.with_ymd_and_hms(2025, 2, 5, 0, 0, 0).unwrap();
        event.all_day = true;

        let feed = encode(&[event]).unwrap();

        assert!(feed.contains("DTSTART;VALUE=DATE:20250203\r\n"), "{feed}");
        assert!(feed.contains("DTEND;VALUE=DATE:20250205\r\n"), "{feed}");
    }

    #[test]
    fn test_encode_rejects_zero_duration() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let event = Event::new("alice", "Broken", start, start);

        assert!(encode(&[event]).is_err());
    }

    #[test]
    fn test_long_multibyte_title_is_folded() {
        let mut event = standup();
        event.title = "é".repeat(60);

        let feed = encode(&[event]).unwrap();

        for line in feed.split("\r\n") {
            assert!(line.len() <= 75, "{} octets", line.len());
        }
        assert!(feed.replace("\r\n ", "").contains(&format!("SUMMARY:{}", "é".repeat(60))));
    }
}
