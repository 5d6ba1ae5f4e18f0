//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{ConfigError, Result};

/// Root configuration.
///
/// Every section is optional in a single file so that layers can be
/// merged; [`registration`](Self::registration) and
/// [`client`](Self::client) check presence once the merge is done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Where the encrypted session lives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectConfig>,
}

impl WardenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: WardenConfig) {
        if other.session_file.is_some() {
            self.session_file = other.session_file;
        }
        if other.registration.is_some() {
            self.registration = other.registration;
        }
        if other.client.is_some() {
            self.client = other.client;
        }
        if other.distribution.is_some() {
            self.distribution = other.distribution;
        }
        if other.refresh.is_some() {
            self.refresh = other.refresh;
        }
        if other.redirect.is_some() {
            self.redirect = other.redirect;
        }
    }

    pub fn registration(&self) -> Result<&RegistrationConfig> {
        self.registration
            .as_ref()
            .ok_or_else(|| missing("registration", "config"))
    }

    pub fn client(&self) -> Result<&ClientConfig> {
        self.client
            .as_ref()
            .ok_or_else(|| missing("client", "config"))
    }

    pub fn distribution(&self) -> DistributionConfig {
        self.distribution.clone().unwrap_or_default()
    }

    pub fn refresh(&self) -> RefreshConfig {
        self.refresh.clone().unwrap_or_default()
    }

    pub fn redirect(&self) -> RedirectConfig {
        self.redirect.clone().unwrap_or_default()
    }

    pub fn has_plaintext_client_secret(&self) -> bool {
        self.client
            .as_ref()
            .is_some_and(|c| c.client_secret.is_some())
    }
}

fn missing(field: &str, context: &str) -> ConfigError {
    ConfigError::MissingField {
        field: field.to_string(),
        context: context.to_string(),
    }
}

/// `[registration]`: the provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    /// Loopback URIs (`http://localhost...`) start a local listener.
    pub redirect_uri: String,
    /// A list or one space-separated string.
    #[serde(default, deserialize_with = "scope_list")]
    pub scope: Vec<String>,
}

fn scope_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scope {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Scope::deserialize(deserializer)? {
        Scope::Joined(s) => s.split_whitespace().map(str::to_string).collect(),
        Scope::List(list) => list,
    })
}

/// `[client]`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// `[distribution]`: where the running instance publishes the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
}

/// `[refresh]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Refresh once this many seconds or fewer remain.
    pub threshold_secs: i64,
    /// Wait before retrying a failed refresh.
    pub retry_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            threshold_secs: 300,
            retry_secs: 60,
        }
    }
}

/// `[redirect]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Listener port; 0 picks a free one.
    pub port: u16,
}
