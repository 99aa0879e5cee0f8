//! Google Calendar as the two-way provider for calsync.
//!
//! [`GoogleAuth`] runs the OAuth authorization-code and refresh exchanges,
//! [`GoogleCalendar`] lists and creates events over the REST API. Both take
//! their [`GoogleConfig`] by value; nothing is shared between users.

mod api;
mod auth;
mod config;
mod http;
mod types;

pub use api::GoogleCalendar;
pub use auth::GoogleAuth;
pub use config::{GoogleConfig, SCOPES};
pub use types::ORIGIN_PROPERTY;
