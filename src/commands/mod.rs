pub mod auth;
pub mod events;
pub mod feed;
pub mod new;
pub mod status;
pub mod sync;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use calsync_core::SyncService;
use calsync_provider_google::{GoogleAuth, GoogleCalendar, GoogleConfig};

use crate::config::{self, Config};
use crate::store::FileStore;

/// Everything a command needs, loaded once per invocation.
pub struct Context {
    pub config: Config,
    pub store: Arc<FileStore>,
    pub service: SyncService,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = config::load_config()?;
        let data_dir = config.data_path();
        let store = Arc::new(
            FileStore::open(&data_dir)
                .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?,
        );
        let service = SyncService::new(store.clone(), store.clone(), config.sync_options()?);

        Ok(Context {
            config,
            store,
            service,
        })
    }

    pub fn user(&self) -> &str {
        &self.config.user
    }

    /// Google OAuth and API clients. Only loaded by commands that talk to Google.
    pub fn google(&self) -> Result<(GoogleAuth, GoogleCalendar)> {
        let google = GoogleConfig::load()?;
        Ok((GoogleAuth::new(google.clone()), GoogleCalendar::new(google)))
    }
}
