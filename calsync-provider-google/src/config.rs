//! OAuth client configuration for the Google provider.
//!
//! User-provided credentials stored at:
//!   ~/.config/calsync/google.toml

use std::path::{Path, PathBuf};

use calsync_core::constants::DEFAULT_CALENDAR_ID;
use calsync_core::{CalSyncError, CalSyncResult};
use serde::{Deserialize, Serialize};

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

const REDIRECT_PORT: u16 = 8085;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Calendar API root, overridable for tests
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Used when a credential names no calendar
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

fn default_redirect_uri() -> String {
    format!("http://localhost:{}/callback", REDIRECT_PORT)
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

impl GoogleConfig {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        GoogleConfig {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base: default_api_base(),
            calendar_id: default_calendar_id(),
        }
    }

    /// Point every endpoint at `base`, e.g. a mock server.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{}/o/oauth2/v2/auth", base);
        self.token_url = format!("{}/token", base);
        self.api_base = format!("{}/calendar/v3", base);
        self
    }

    pub fn default_path() -> CalSyncResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| CalSyncError::Config("Could not determine config directory".into()))?
            .join("calsync")
            .join("google.toml"))
    }

    pub fn load() -> CalSyncResult<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> CalSyncResult<Self> {
        if !path.exists() {
            return Err(CalSyncError::Config(format!(
                "Google credentials not found.\n\n\
                Create {} with:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            CalSyncError::Config(format!(
                "Failed to parse Google credentials from {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google.toml");
        std::fs::write(&path, "client_id = \"id\"\nclient_secret = \"secret\"\n").unwrap();

        let config = GoogleConfig::load_from(&path).unwrap();

        assert_eq!(config, GoogleConfig::new("id", "secret"));
        assert_eq!(config.calendar_id, "primary");
    }

    #[test]
    fn test_missing_file_explains_setup() {
        let dir = tempfile::tempdir().unwrap();

        let err = GoogleConfig::load_from(&dir.path().join("google.toml")).unwrap_err();

        assert!(matches!(err, CalSyncError::Config(ref msg) if msg.contains("client_id")));
    }
}
