//! Token and registration data carried through the vault.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// An OAuth 2.0 token as held by [`TokenState`](crate::state::TokenState).
///
/// `expires_at` is an absolute UNIX timestamp in seconds. Fields the
/// provider returns that we do not interpret (`id_token`, `expires_in`,
/// ...) are kept in `extra` so they survive a save/load cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(
        default,
        deserialize_with = "epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<i64>,

    #[serde(default, deserialize_with = "scope_list")]
    pub scope: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Token {
    /// Create a bearer token with no refresh token and no expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
            expires_at: None,
            scope: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Seconds until expiry relative to `now`, negative once expired.
    pub fn expires_in(&self, now: i64) -> Option<i64> {
        self.expires_at.map(|at| at - now)
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Endpoints and scope of the client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub redirect_uri: String,
    #[serde(default, deserialize_with = "scope_list")]
    pub scope: Vec<String>,
}

impl Registration {
    /// Whether the redirect URI points at this host over plain HTTP, in
    /// which case the authorization redirect can be captured locally.
    pub fn is_loopback_redirect(&self) -> bool {
        let Ok(url) = url::Url::parse(&self.redirect_uri) else {
            return false;
        };
        url.scheme() == "http"
            && matches!(
                url.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("[::1]")
            )
    }
}

/// Client credentials presented to the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Accepts integral or fractional epoch seconds.
fn epoch_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.map(|secs| secs as i64))
}

/// Accepts a space-separated string or a list of strings.
fn scope_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scope {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Option::<Scope>::deserialize(deserializer)? {
        Some(Scope::Joined(s)) => s.split_whitespace().map(str::to_string).collect(),
        Some(Scope::List(list)) => list,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_accepts_fractional_expiry_and_string_scope() {
        let json = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "Bearer",
            "expires_at": 1700000000.75,
            "expires_in": 3599,
            "scope": "openid offline_access"
        }"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_at, Some(1_700_000_000));
        assert_eq!(token.scope, vec!["openid", "offline_access"]);
        assert_eq!(token.extra.get("expires_in"), Some(&serde_json::json!(3599)));
    }

    #[test]
    fn test_token_without_access_token_is_no_token() {
        let token: Token = serde_json::from_str(r#"{"refresh_token": "rt"}"#).unwrap();
        assert!(token.access_token.is_empty());
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));

        let state = crate::state::TokenState::with_token(token);
        assert!(matches!(
            state.get(),
            Err(crate::error::WardenError::NoToken(_))
        ));
    }

    #[test]
    fn test_token_keeps_unknown_fields() {
        let json = r#"{"access_token": "at", "id_token": "idt", "scope": ["a", "b"]}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.scope, vec!["a", "b"]);

        let back = serde_json::to_value(&token).unwrap();
        assert_eq!(back["id_token"], "idt");
        assert!(back.get("refresh_token").is_none());
    }

    #[test]
    fn test_loopback_detection() {
        let mut reg = Registration {
            authorize_endpoint: "https://auth.example.com/authorize".to_string(),
            token_endpoint: "https://auth.example.com/token".to_string(),
            redirect_uri: "http://localhost".to_string(),
            scope: vec![],
        };
        assert!(reg.is_loopback_redirect());

        reg.redirect_uri = "http://127.0.0.1:8400/cb".to_string();
        assert!(reg.is_loopback_redirect());

        reg.redirect_uri = "https://login.example.com/nativeclient".to_string();
        assert!(!reg.is_loopback_redirect());

        reg.redirect_uri = "not a url".to_string();
        assert!(!reg.is_loopback_redirect());
    }

    #[test]
    fn test_client_secret_redacted_in_debug() {
        let client = ClientCredentials {
            client_id: "id".to_string(),
            client_secret: Some("hunter2".to_string()),
        };
        let shown = format!("{:?}", client);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("REDACTED"));
    }
}
