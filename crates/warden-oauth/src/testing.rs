//! In-process stand-in for the token endpoint.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, WardenError};
use crate::oauth::OAuthClient;
use crate::token::{ClientCredentials, Registration, Token};

#[derive(Debug, Clone)]
pub struct ExchangeCall {
    pub redirect_uri: String,
    pub code: String,
    pub verifier: String,
}

/// Hands out queued tokens, then `fallback`; with no fallback every call
/// fails with a backend error.
#[derive(Debug, Default)]
pub struct FakeOAuthClient {
    queued: Mutex<VecDeque<Token>>,
    fallback: Option<Token>,
    exchanges: Mutex<Vec<ExchangeCall>>,
    refreshes: Mutex<Vec<String>>,
}

impl FakeOAuthClient {
    pub fn new(fallback: Token) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push(&self, token: Token) {
        self.queued.lock().push_back(token);
    }

    pub fn last_exchange(&self) -> Option<ExchangeCall> {
        self.exchanges.lock().last().cloned()
    }

    pub fn refresh_calls(&self) -> Vec<String> {
        self.refreshes.lock().clone()
    }

    fn next_token(&self) -> Result<Token> {
        if let Some(token) = self.queued.lock().pop_front() {
            return Ok(token);
        }
        self.fallback
            .clone()
            .ok_or_else(|| WardenError::Backend("invalid_grant".to_string()))
    }
}

#[async_trait]
impl OAuthClient for FakeOAuthClient {
    async fn exchange_code(
        &self,
        _registration: &Registration,
        _client: &ClientCredentials,
        redirect_uri: &str,
        code: &str,
        verifier: &str,
    ) -> Result<Token> {
        self.exchanges.lock().push(ExchangeCall {
            redirect_uri: redirect_uri.to_string(),
            code: code.to_string(),
            verifier: verifier.to_string(),
        });
        self.next_token()
    }

    async fn refresh(
        &self,
        _registration: &Registration,
        _client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<Token> {
        self.refreshes.lock().push(refresh_token.to_string());
        self.next_token()
    }
}
