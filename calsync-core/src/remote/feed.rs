use crate::error::CalSyncResult;
use crate::event::Event;
use crate::ics::{self, DecodedFeed};

/// The one-way provider: a feed is produced for export and consumed on
/// import. Nothing is listed or created remotely.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedGateway;

impl FeedGateway {
    pub fn encode(&self, events: &[Event]) -> CalSyncResult<String> {
        ics::encode(events)
    }

    pub fn decode(&self, text: &str) -> CalSyncResult<DecodedFeed> {
        ics::decode(text)
    }
}
