//! OAuth seam and token lifecycle.

mod token;

pub use token::TokenManager;

use async_trait::async_trait;

use crate::credential::{Provider, TokenGrant};
use crate::error::CalSyncResult;

/// Authorization-code flow of a two-way provider.
///
/// Implementations carry their client configuration as a value. Errors are
/// `AuthRejected` when the provider refuses a code or refresh token and
/// `RemoteUnavailable` for anything transient.
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    fn provider(&self) -> Provider;

    /// URL the user is sent to for consent.
    fn authorization_url(&self, state: Option<&str>) -> CalSyncResult<String>;

    async fn exchange_code(&self, code: &str) -> CalSyncResult<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> CalSyncResult<TokenGrant>;
}
