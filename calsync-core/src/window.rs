//! The time window a sync operates on.

use chrono::{DateTime, Duration, Utc};

use crate::constants::{WINDOW_FUTURE_DAYS, WINDOW_PAST_DAYS};

/// Half-open interval `[now - 30d, now + 90d)`, derived at the start of
/// each invocation and never stored. Matches the provider's exclusive
/// `timeMin`/`timeMax` filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    pub fn at(now: DateTime<Utc>) -> Self {
        SyncWindow {
            from: now - Duration::days(WINDOW_PAST_DAYS),
            to: now + Duration::days(WINDOW_FUTURE_DAYS),
        }
    }

    pub fn current() -> Self {
        Self::at(Utc::now())
    }

    /// True if `[start, end)` overlaps the window. An event ending exactly
    /// at `from` or starting exactly at `to` is outside.
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        end > self.from && start < self.to
    }

    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }
}
