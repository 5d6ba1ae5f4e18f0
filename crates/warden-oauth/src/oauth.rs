//! OAuth 2.0 authorization-code (PKCE) and refresh-token grants.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};

use crate::error::{Result, WardenError};
use crate::token::{ClientCredentials, Registration, Token};

/// Bytes of randomness behind a PKCE verifier.
const VERIFIER_BYTES: usize = 90;

/// PKCE code verifier and challenge pair.
///
/// Lives for one authorization attempt and is never persisted.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Challenge method sent alongside the challenge.
    pub const METHOD: &'static str = "S256";

    /// Generate a new PKCE challenge pair.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; VERIFIER_BYTES];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = Self::challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }

    /// The S256 challenge of a verifier: base64url(sha256(verifier)), unpadded.
    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL for the OAuth flow.
pub fn build_authorization_url(
    registration: &Registration,
    client: &ClientCredentials,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
) -> String {
    let scope = registration.scope.join(" ");
    let params = [
        ("response_type", "code"),
        ("client_id", client.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("state", state),
        ("code_challenge", challenge),
        ("code_challenge_method", PkceChallenge::METHOD),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if registration.authorize_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{}{}", registration.authorize_endpoint, separator, query)
}

/// The token endpoint operations the vault relies on.
///
/// Implementations must tolerate the provider returning a different scope
/// than requested.
#[async_trait]
pub trait OAuthClient: Send + Sync + std::fmt::Debug {
    /// Exchange an authorization code for a token.
    async fn exchange_code(
        &self,
        registration: &Registration,
        client: &ClientCredentials,
        redirect_uri: &str,
        code: &str,
        verifier: &str,
    ) -> Result<Token>;

    /// Obtain a fresh token with a refresh token.
    async fn refresh(
        &self,
        registration: &Registration,
        client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<Token>;
}

/// Form-encoded token endpoint client over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpOAuthClient {
    http: reqwest::Client,
}

impl HttpOAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn post_token(
        &self,
        registration: &Registration,
        client: &ClientCredentials,
        mut form: Vec<(&str, String)>,
        what: &str,
    ) -> Result<Token> {
        form.push(("client_id", client.client_id.clone()));
        if let Some(secret) = &client.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let response = self
            .http
            .post(&registration.token_endpoint)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| WardenError::Network(format!("{} request failed: {}", what, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WardenError::Backend(format!(
                "{} failed ({}): {}",
                what, status, error_text
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| WardenError::Backend(format!("Failed to parse {} response: {}", what, e)))?;

        Ok(body.into_token(chrono::Utc::now().timestamp()))
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    async fn exchange_code(
        &self,
        registration: &Registration,
        client: &ClientCredentials,
        redirect_uri: &str,
        code: &str,
        verifier: &str,
    ) -> Result<Token> {
        let form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("code_verifier", verifier.to_string()),
        ];
        self.post_token(registration, client, form, "Token exchange")
            .await
    }

    async fn refresh(
        &self,
        registration: &Registration,
        client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<Token> {
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        self.post_token(registration, client, form, "Token refresh")
            .await
    }
}

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default, deserialize_with = "lifetime_secs")]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<serde_json::Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl TokenResponse {
    fn into_token(self, now: i64) -> Token {
        let scope = match self.scope {
            Some(serde_json::Value::String(s)) => {
                s.split_whitespace().map(str::to_string).collect()
            }
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let mut extra = self.extra;
        if let Some(expires_in) = self.expires_in {
            extra.insert("expires_in".to_string(), expires_in.into());
        }

        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: self.expires_in.map(|secs| now + secs),
            scope,
            extra,
        }
    }
}

/// `expires_in` as a number or a numeric string; some providers quote it.
fn lifetime_secs<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lifetime {
        Number(f64),
        Text(String),
    }

    let secs = match Option::<Lifetime>::deserialize(deserializer)? {
        Some(Lifetime::Number(n)) => n,
        Some(Lifetime::Text(s)) => s.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(format!("expires_in is not a number: {s:?}"))
        })?,
        None => return Ok(None),
    };
    if !secs.is_finite() {
        return Err(serde::de::Error::custom("expires_in is not finite"));
    }
    Ok(Some(secs.floor() as i64))
}
