//! Provider credentials and their token state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CALENDAR_ID, TOKEN_EXPIRY_LEEWAY_SECS};
use crate::error::CalSyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Two-way OAuth calendar (Google Calendar)
    Google,
    /// One-way iCalendar feed export/import
    Ical,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::Ical];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Ical => "ical",
        }
    }

    pub fn is_two_way(&self) -> bool {
        matches!(self, Provider::Google)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Provider {
    type Err = CalSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            // The feed provider was historically called "apple"
            "ical" | "apple" => Ok(Provider::Ical),
            other => Err(CalSyncError::Config(format!("Unknown provider '{}'", other))),
        }
    }
}

/// Where a credential sits in its lifecycle.
///
/// `Unlinked` means no record exists. `Revoked` is terminal until a new
/// OAuth handshake replaces the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unlinked,
    Valid,
    Expiring,
    Refreshing,
    Revoked,
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TokenState::Unlinked => "unlinked",
            TokenState::Valid => "valid",
            TokenState::Expiring => "expiring",
            TokenState::Refreshing => "refreshing",
            TokenState::Revoked => "revoked",
        };
        write!(f, "{}", label)
    }
}

/// One provider's grant for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub user: String,
    pub provider: Provider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub calendar_id: String,
    pub active: bool,
    /// Opaque provider settings
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// A credential freshly created from a token grant.
    pub fn from_grant(user: &str, provider: Provider, grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        Credential {
            user: user.to_string(),
            provider,
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            token_type: grant.token_type.clone().unwrap_or_else(|| "Bearer".to_string()),
            expires_at: grant.expires_in.map(|secs| now + Duration::seconds(secs)),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            active: true,
            settings: serde_json::json!({}),
            last_synced_at: None,
        }
    }

    /// A token-less status record for providers that need no OAuth grant.
    pub fn status_record(user: &str, provider: Provider) -> Self {
        Credential {
            user: user.to_string(),
            provider,
            access_token: String::new(),
            refresh_token: None,
            token_type: String::new(),
            expires_at: None,
            calendar_id: String::new(),
            active: true,
            settings: serde_json::json!({}),
            last_synced_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    fn expires_within_leeway(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| exp <= now + Duration::seconds(TOKEN_EXPIRY_LEEWAY_SECS))
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Lifecycle state at `now`, ignoring any refresh in flight.
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if !self.active {
            TokenState::Revoked
        } else if self.is_expired(now) {
            if self.has_refresh_token() {
                TokenState::Expiring
            } else {
                TokenState::Revoked
            }
        } else if self.expires_within_leeway(now) {
            TokenState::Expiring
        } else {
            TokenState::Valid
        }
    }

    /// Apply a refresh grant. Providers often omit the refresh token on
    /// refresh, in which case the current one is kept.
    pub fn apply_refresh(&mut self, grant: &TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token.clone();
        if let Some(ref refresh) = grant.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
        if let Some(ref token_type) = grant.token_type {
            self.token_type = token_type.clone();
        }
        self.expires_at = grant.expires_in.map(|secs| now + Duration::seconds(secs));
        self.active = true;
    }
}

/// Tokens returned by an authorization-code or refresh exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap()
    }

    fn grant(expires_in: i64, refresh: Option<&str>) -> TokenGrant {
        TokenGrant {
            access_token: "at-1".into(),
            refresh_token: refresh.map(String::from),
            token_type: None,
            expires_in: Some(expires_in),
        }
    }

    #[test]
    fn test_state_transitions_with_time() {
        let cred = Credential::from_grant("alice", Provider::Google, &grant(3600, Some("rt")), now());

        assert_eq!(cred.token_type, "Bearer");
        assert_eq!(cred.calendar_id, "primary");
        assert_eq!(cred.state(now()), TokenState::Valid);
        assert_eq!(cred.state(now() + Duration::seconds(3590)), TokenState::Expiring);
        assert_eq!(cred.state(now() + Duration::seconds(3600)), TokenState::Expiring);
    }

    #[test]
    fn test_expired_without_refresh_token_is_revoked() {
        let cred = Credential::from_grant("alice", Provider::Google, &grant(60, None), now());

        assert_eq!(cred.state(now() + Duration::hours(1)), TokenState::Revoked);
    }

    #[test]
    fn test_inactive_is_revoked() {
        let mut cred = Credential::from_grant("alice", Provider::Google, &grant(3600, Some("rt")), now());
        cred.active = false;

        assert_eq!(cred.state(now()), TokenState::Revoked);
    }

    #[test]
    fn test_apply_refresh_keeps_refresh_token_when_omitted() {
        let mut cred = Credential::from_grant("alice", Provider::Google, &grant(60, Some("rt-1")), now());
        let later = now() + Duration::hours(2);

        cred.apply_refresh(
            &TokenGrant {
                access_token: "at-2".into(),
                refresh_token: None,
                token_type: None,
                expires_in: Some(3600),
            },
            later,
        );

        assert_eq!(cred.access_token, "at-2");
        assert_eq!(cred.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(cred.expires_at, Some(later + Duration::hours(1)));
        assert_eq!(cred.state(later), TokenState::Valid);
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("Apple".parse::<Provider>().unwrap(), Provider::Ical);
        assert!("outlook".parse::<Provider>().is_err());
    }
}
