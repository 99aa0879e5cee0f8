//! Feed codec for the one-way provider.
//!
//! Only the minimal VEVENT subset is written: UID, DTSTAMP, DTSTART, DTEND,
//! SUMMARY and an optional DESCRIPTION. Escaping and line folding are left
//! to the icalendar crate on both sides. Reading is more lenient and accepts
//! dates, UTC, floating and TZID date-times in any property order.

mod generate;
mod parse;

pub use generate::encode;
pub use parse::{DecodedFeed, RejectedComponent, decode};
