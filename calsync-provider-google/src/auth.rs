//! OAuth authorization-code flow against Google's token endpoint.

use async_trait::async_trait;
use calsync_core::auth::OAuthFlow;
use calsync_core::{CalSyncError, CalSyncResult, Provider, TokenGrant};
use tracing::debug;
use url::Url;

use crate::config::{GoogleConfig, SCOPES};
use crate::http::{error_for_response, transport_error};

pub struct GoogleAuth {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(config: GoogleConfig) -> Self {
        GoogleAuth {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn post_token(&self, params: &[(&str, &str)], context: &str) -> CalSyncResult<TokenGrant> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;

        if !response.status().is_success() {
            return Err(error_for_response(context, response).await);
        }

        let grant: TokenGrant = response.json().await.map_err(|e| {
            CalSyncError::RemoteUnavailable(format!("{}: malformed token response: {}", context, e))
        })?;

        if grant.access_token.is_empty() {
            return Err(CalSyncError::AuthRejected(format!(
                "{}: token response has no access token",
                context
            )));
        }
        Ok(grant)
    }
}

#[async_trait]
impl OAuthFlow for GoogleAuth {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: Option<&str>) -> CalSyncResult<String> {
        let scopes = SCOPES.join(" ");
        let mut params = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scopes.as_str()),
            // offline + consent so Google issues a refresh token every time
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];
        if let Some(state) = state {
            params.push(("state", state));
        }

        let url = Url::parse_with_params(&self.config.auth_url, &params)
            .map_err(|e| CalSyncError::Config(format!("Invalid auth URL: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> CalSyncResult<TokenGrant> {
        debug!("Exchanging authorization code");
        self.post_token(
            &[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
            "Failed to exchange authorization code",
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> CalSyncResult<TokenGrant> {
        debug!("Refreshing Google access token");
        self.post_token(
            &[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
            "Failed to refresh token",
        )
        .await
    }
}
