//! Error types for calsync.

use thiserror::Error;

use crate::credential::Provider;

/// Errors that can occur in sync, import, export, and auth operations.
#[derive(Error, Debug)]
pub enum CalSyncError {
    /// The credential cannot be used and cannot be refreshed.
    /// Only a new OAuth handshake recovers from this.
    #[error("{0} credential expired; reconnect required")]
    CredentialExpired(Provider),

    /// Transient network or API failure. Safe to retry the whole sync later.
    #[error("Remote calendar unavailable: {0}")]
    RemoteUnavailable(String),

    /// The provider refused an authorization code or refresh token.
    #[error("Provider rejected authorization: {0}")]
    AuthRejected(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Two local events claim the same remote identity.
    #[error("Duplicate identity '{identity}' shared by local events {event_ids:?}")]
    DuplicateIdentity {
        identity: String,
        event_ids: Vec<String>,
    },

    #[error("No {0} connection for this user")]
    NotConnected(Provider),

    #[error("A {provider} sync is already running for user '{user}'")]
    SyncInProgress { user: String, provider: Provider },

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: Provider,
        operation: &'static str,
    },

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CalSyncError {
    /// Whether a later invocation may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CalSyncError::RemoteUnavailable(_))
    }
}

impl From<serde_json::Error> for CalSyncError {
    fn from(err: serde_json::Error) -> Self {
        CalSyncError::Serialization(err.to_string())
    }
}

/// Result type alias for calsync operations.
pub type CalSyncResult<T> = Result<T, CalSyncError>;
