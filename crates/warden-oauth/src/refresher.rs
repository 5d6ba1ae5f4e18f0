//! Keeps the held token from expiring.

use std::sync::Arc;

use crate::error::{Result, WardenError};
use crate::oauth::OAuthClient;
use crate::state::TokenState;
use crate::token::Token;
use crate::vault::SessionVault;

/// Refresh once the token has this many seconds or fewer left.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Whether `token` should be refreshed now.
///
/// A token without an expiry is always due, since nothing says it is
/// still valid.
pub fn is_refresh_due(token: &Token, threshold_secs: i64) -> bool {
    is_refresh_due_at(token, threshold_secs, chrono::Utc::now().timestamp())
}

/// [`is_refresh_due`] against an explicit clock.
pub fn is_refresh_due_at(token: &Token, threshold_secs: i64, now: i64) -> bool {
    match token.expires_in(now) {
        Some(remaining) => remaining <= threshold_secs,
        None => true,
    }
}

/// Drives refreshes through the OAuth client and persists the result.
///
/// Calls to [`refresh`](Self::refresh) are not deduplicated; `&mut self`
/// keeps them serialized for a single owner.
#[derive(Debug)]
pub struct TokenRefresher {
    state: Arc<TokenState>,
    oauth: Arc<dyn OAuthClient>,
    vault: SessionVault,
    threshold_secs: i64,
}

impl TokenRefresher {
    pub fn new(state: Arc<TokenState>, oauth: Arc<dyn OAuthClient>, vault: SessionVault) -> Self {
        Self {
            state,
            oauth,
            vault,
            threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
        }
    }

    pub fn with_threshold(mut self, threshold_secs: i64) -> Self {
        self.threshold_secs = threshold_secs;
        self
    }

    /// Whether the held token is due for a refresh.
    pub fn is_due(&self) -> Result<bool> {
        let token = self.state.get()?;
        Ok(is_refresh_due(&token, self.threshold_secs))
    }

    /// UNIX time at which the held token becomes due.
    pub fn next_refresh_at(&self) -> Result<i64> {
        Ok(self.state.expiry()? - self.threshold_secs)
    }

    /// Exchange the refresh token for a new token, install it and save the
    /// session.
    ///
    /// Errors from the provider are returned as-is; nothing is retried here.
    pub async fn refresh(&mut self) -> Result<Token> {
        let current = self.state.get()?;
        let refresh_token = current
            .refresh_token
            .ok_or_else(|| WardenError::NoToken("Token has no refresh token".to_string()))?;

        tracing::info!("Refreshing token");
        let mut token = self
            .oauth
            .refresh(self.vault.registration(), self.vault.client(), &refresh_token)
            .await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token);
        }

        self.state.set(token.clone());
        self.vault.save(&token, None)?;
        tracing::info!(expires_at = ?token.expires_at, "Token refreshed");
        Ok(token)
    }

    /// Refresh only when due. Returns the new token if one was fetched.
    pub async fn refresh_if_due(&mut self) -> Result<Option<Token>> {
        if self.is_due()? {
            self.refresh().await.map(Some)
        } else {
            Ok(None)
        }
    }
}
