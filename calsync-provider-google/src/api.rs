//! Calendar API gateway: list a window, create an event.

use std::collections::HashSet;

use async_trait::async_trait;
use calsync_core::remote::RemoteCalendar;
use calsync_core::{CalSyncError, CalSyncResult, Credential, Event, Provider, RemoteEvent, SyncWindow};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::GoogleConfig;
use crate::http::{error_for_response, transport_error};
use crate::types::{EventsPage, GoogleEvent};

const PAGE_SIZE: &str = "250";

pub struct GoogleCalendar {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new(config: GoogleConfig) -> Self {
        GoogleCalendar {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn events_url(&self, credential: &Credential) -> CalSyncResult<Url> {
        let calendar_id: &str = if credential.calendar_id.is_empty() {
            &self.config.calendar_id
        } else {
            &credential.calendar_id
        };

        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| CalSyncError::Config(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CalSyncError::Config("API base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(&["calendars", calendar_id, "events"]);
        Ok(url)
    }
}

#[async_trait]
impl RemoteCalendar for GoogleCalendar {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    /// Fetch every page; a partial listing would look like remote deletions.
    #[instrument(skip_all, fields(calendar = %credential.calendar_id))]
    async fn list(
        &self,
        credential: &Credential,
        window: &SyncWindow,
    ) -> CalSyncResult<Vec<RemoteEvent>> {
        let base = self.events_url(credential)?;
        let time_min = window.from_rfc3339();
        let time_max = window.to_rfc3339();

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &time_min)
                    .append_pair("timeMax", &time_max)
                    .append_pair("singleEvents", "true")
                    .append_pair("maxResults", PAGE_SIZE);
                if let Some(ref token) = page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self
                .http
                .get(url)
                .bearer_auth(&credential.access_token)
                .send()
                .await
                .map_err(|e| transport_error("Failed to fetch events", e))?;

            if !response.status().is_success() {
                return Err(error_for_response("Failed to fetch events", response).await);
            }

            let page: EventsPage = response.json().await.map_err(|e| {
                CalSyncError::RemoteUnavailable(format!("Malformed events page: {}", e))
            })?;
            debug!(items = page.items.len(), "Fetched page");

            for item in page.items {
                if item.is_cancelled() {
                    continue;
                }
                if let Some(reason) = item.missing_times() {
                    warn!(remote_id = %item.id, reason, "Event has no usable time range");
                }
                events.push(item.into_remote());
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(CalSyncError::RemoteUnavailable(
                            "Events listing repeated a page token".into(),
                        ));
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(events)
    }

    #[instrument(skip_all, fields(event_id = %event.id))]
    async fn create(&self, credential: &Credential, event: &Event) -> CalSyncResult<String> {
        let url = self.events_url(credential)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&credential.access_token)
            .json(&GoogleEvent::for_insert(event))
            .send()
            .await
            .map_err(|e| transport_error("Failed to create event", e))?;

        if !response.status().is_success() {
            return Err(error_for_response("Failed to create event", response).await);
        }

        let created: GoogleEvent = response.json().await.map_err(|e| {
            CalSyncError::RemoteUnavailable(format!("Malformed create response: {}", e))
        })?;

        if created.id.is_empty() {
            return Err(CalSyncError::RemoteUnavailable(
                "Create response has no event id".into(),
            ));
        }
        debug!(remote_id = %created.id, "Created remote event");
        Ok(created.id)
    }
}
