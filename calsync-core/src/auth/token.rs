use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::auth::OAuthFlow;
use crate::credential::{Credential, TokenState};
use crate::error::{CalSyncError, CalSyncResult};
use crate::remote::with_timeout;
use crate::store::CredentialStore;

/// Hands out credentials whose access token is usable right now.
pub struct TokenManager<'a> {
    store: &'a dyn CredentialStore,
    oauth: &'a dyn OAuthFlow,
    timeout: Duration,
}

impl<'a> TokenManager<'a> {
    pub fn new(store: &'a dyn CredentialStore, oauth: &'a dyn OAuthFlow, timeout: Duration) -> Self {
        TokenManager {
            store,
            oauth,
            timeout,
        }
    }

    /// Return `credential` with a usable access token, refreshing it at
    /// most once. A refreshed credential is persisted before returning.
    ///
    /// A rejected refresh (or an expired token without a refresh token)
    /// deactivates the credential and fails with `CredentialExpired`.
    #[instrument(skip_all, fields(user = %credential.user, provider = %credential.provider))]
    pub async fn ensure_valid(
        &self,
        mut credential: Credential,
        now: DateTime<Utc>,
    ) -> CalSyncResult<Credential> {
        let state = credential.state(now);
        debug!(state = %state, "Checking credential");

        match state {
            TokenState::Valid => Ok(credential),
            TokenState::Revoked => {
                if credential.active {
                    warn!("Token expired and no refresh token is stored");
                    self.revoke(&mut credential)?;
                }
                Err(CalSyncError::CredentialExpired(credential.provider))
            }
            TokenState::Expiring if !credential.has_refresh_token() => {
                // Still usable until it actually expires
                Ok(credential)
            }
            TokenState::Expiring => self.refresh(credential, now).await,
            TokenState::Unlinked | TokenState::Refreshing => {
                Err(CalSyncError::NotConnected(credential.provider))
            }
        }
    }

    async fn refresh(
        &self,
        mut credential: Credential,
        now: DateTime<Utc>,
    ) -> CalSyncResult<Credential> {
        debug!(state = %TokenState::Refreshing, "Refreshing access token");

        let refresh_token = credential.refresh_token.clone().unwrap_or_default();
        match with_timeout(self.timeout, self.oauth.refresh(&refresh_token)).await {
            Ok(grant) => {
                credential.apply_refresh(&grant, now);
                self.store.put_credential(&credential)?;
                debug!(state = %TokenState::Valid, expires_at = ?credential.expires_at, "Token refreshed");
                Ok(credential)
            }
            Err(CalSyncError::AuthRejected(reason)) => {
                warn!(%reason, "Provider rejected the refresh token");
                self.revoke(&mut credential)?;
                Err(CalSyncError::CredentialExpired(credential.provider))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, credential left unchanged");
                Err(e)
            }
        }
    }

    fn revoke(&self, credential: &mut Credential) -> CalSyncResult<()> {
        credential.active = false;
        self.store.put_credential(credential)?;
        debug!(state = %TokenState::Revoked, "Credential deactivated");
        Ok(())
    }
}
