/// Days before now covered by the sync window.
pub const WINDOW_PAST_DAYS: i64 = 30;

/// Days after now covered by the sync window.
pub const WINDOW_FUTURE_DAYS: i64 = 90;

/// Tokens expiring within this many seconds are refreshed ahead of time.
pub const TOKEN_EXPIRY_LEEWAY_SECS: i64 = 60;

pub const DEFAULT_PUSH_CONCURRENCY: usize = 4;

pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Color given to events materialized from a remote calendar or feed.
pub const DEFAULT_EVENT_COLOR: &str = "#3788d8";

pub const MAX_TITLE_LEN: usize = 255;

/// Title given to remote records that carry none.
pub const UNTITLED: &str = "(No title)";

/// Google's alias for the user's main calendar
pub const DEFAULT_CALENDAR_ID: &str = "primary";
