use anyhow::{Context as _, Result};
use calsync_core::event::Event;
use calsync_core::store::EventStore;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::Context;

/// A parsed start or end: either a whole day or an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
enum When {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    ctx: &Context,
    title: &str,
    start: &str,
    end: Option<String>,
    duration: Option<String>,
    description: Option<String>,
    all_day: bool,
    color: Option<String>,
) -> Result<()> {
    let start = parse_when(start)?;
    if all_day && !matches!(start, When::Date(_)) {
        anyhow::bail!("--all-day needs a plain date start, e.g. 2025-03-20");
    }
    let end = match (end, duration) {
        (Some(end), _) => parse_when(&end)?,
        (None, Some(duration)) => apply_duration(start, &duration)?,
        (None, None) => default_end(start),
    };

    let (start_utc, end_utc, all_day) = match (start, end) {
        (When::Date(s), When::Date(e)) => (midnight_utc(s), midnight_utc(e), true),
        (When::Instant(s), When::Instant(e)) => (s, e, false),
        _ => anyhow::bail!("Start and end must both be dates or both be date-times"),
    };

    let mut event = Event::new(ctx.user(), title, start_utc, end_utc);
    event.all_day = all_day;
    event.description = description.filter(|d| !d.is_empty());
    if let Some(color) = color {
        event.color = color;
    }

    ctx.store.put_event(&event)?;
    println!("Created: {}", event.title);
    Ok(())
}

/// "YYYY-MM-DD" is a whole day; "YYYY-MM-DDTHH:MM" is local time; RFC 3339
/// carries its own offset.
fn parse_when(input: &str) -> Result<When> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(When::Date(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(When::Instant(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            let local = Local
                .from_local_datetime(&naive)
                .earliest()
                .with_context(|| format!("\"{}\" does not exist in the local time zone", input))?;
            return Ok(When::Instant(local.with_timezone(&Utc)));
        }
    }

    anyhow::bail!("Could not parse date/time: \"{}\"", input)
}

fn apply_duration(start: When, input: &str) -> Result<When> {
    let std_dur = humantime::parse_duration(input)
        .with_context(|| format!("Could not parse duration: \"{}\"", input))?;
    let duration = Duration::from_std(std_dur).context("Duration too large")?;

    match start {
        When::Instant(dt) => Ok(When::Instant(dt + duration)),
        When::Date(date) => {
            if duration.num_seconds() % 86_400 != 0 {
                anyhow::bail!("All-day events need a duration in whole days");
            }
            Ok(When::Date(date + duration))
        }
    }
}

fn default_end(start: When) -> When {
    match start {
        When::Date(date) => When::Date(date + Duration::days(1)),
        When::Instant(dt) => When::Instant(dt + Duration::hours(1)),
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_only_is_all_day() {
        let when = parse_when("2025-03-20").unwrap();
        assert_eq!(when, When::Date(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()));
        assert_eq!(
            default_end(when),
            When::Date(NaiveDate::from_ymd_opt(2025, 3, 21).unwrap())
        );
    }

    #[test]
    fn test_rfc3339_keeps_offset() {
        let when = parse_when("2025-03-20T15:00:00+01:00").unwrap();
        assert_eq!(
            when,
            When::Instant(Utc.with_ymd_and_hms(2025, 3, 20, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_duration_applies_to_instant() {
        let start = When::Instant(Utc.with_ymd_and_hms(2025, 3, 20, 14, 0, 0).unwrap());
        assert_eq!(
            apply_duration(start, "1h 30m").unwrap(),
            When::Instant(Utc.with_ymd_and_hms(2025, 3, 20, 15, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_all_day_duration_must_be_whole_days() {
        let start = When::Date(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap());
        assert!(apply_duration(start, "2days").is_ok());
        assert!(apply_duration(start, "3h").is_err());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_when("next tuesday-ish").is_err());
    }
}
