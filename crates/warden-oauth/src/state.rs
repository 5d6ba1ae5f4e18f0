//! The shared, change-notifying holder of the current token.
//!
//! One [`TokenState`] is created per running instance and handed by
//! `Arc` to the refresher and both distributors. Readers always get a
//! cloned snapshot; the channel lock is never held across an await or
//! any I/O.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WardenError};
use crate::token::Token;

/// Latest-value broadcast of the current token.
#[derive(Debug)]
pub struct TokenState {
    tx: watch::Sender<Option<Token>>,
    closed: CancellationToken,
}

impl Default for TokenState {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenState {
    /// Create an empty state; [`get`](Self::get) fails until a token is set.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            closed: CancellationToken::new(),
        }
    }

    pub fn with_token(token: Token) -> Self {
        let state = Self::new();
        state.set(token);
        state
    }

    /// Snapshot of the current token.
    pub fn get(&self) -> Result<Token> {
        let guard = self.tx.borrow();
        match guard.as_ref() {
            Some(token) if !token.access_token.is_empty() => Ok(token.clone()),
            Some(_) => Err(WardenError::NoToken("Token has no access token".to_string())),
            None => Err(WardenError::NoToken("No token has been set".to_string())),
        }
    }

    /// The current access token alone.
    pub fn access_token(&self) -> Result<String> {
        self.get().map(|token| token.access_token)
    }

    /// Absolute expiry of the current token, in UNIX seconds.
    pub fn expiry(&self) -> Result<i64> {
        self.get()?.expires_at.ok_or(WardenError::MissingExpiry)
    }

    /// Replace the token and wake every waiter.
    ///
    /// The token is installed whole before any waiter observes it.
    pub fn set(&self, token: Token) {
        tracing::debug!(expires_at = ?token.expires_at, "Installing new token");
        self.tx.send_replace(Some(token));
    }

    /// Wait until the held access token differs from `last_seen`.
    ///
    /// Returns immediately if it already differs. Installing a token whose
    /// access token equals `last_seen` does not release the waiter.
    /// Returns `None` once the state has been [closed](Self::close).
    pub async fn wait_for_change(&self, last_seen: Option<&str>) -> Option<Token> {
        let mut rx = self.tx.subscribe();
        let changed = rx.wait_for(|current| match current {
            Some(token) if !token.access_token.is_empty() => {
                Some(token.access_token.as_str()) != last_seen
            }
            _ => false,
        });

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            result = changed => result.ok().and_then(|guard| (*guard).clone()),
        }
    }

    /// Release every current and future waiter.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
