//! Client secret resolution.
//!
//! Resolution order:
//! 1. `WARDEN_CLIENT_SECRET` environment variable
//! 2. Config file (with warning)

/// Environment variable holding the client secret.
pub const CLIENT_SECRET_ENV: &str = "WARDEN_CLIENT_SECRET";

/// Result of secret resolution with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"***")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve the client secret from the environment, then `config_value`.
///
/// Public clients have no secret; `None` is a normal outcome.
pub fn resolve_client_secret(config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_with_env(std::env::var(CLIENT_SECRET_ENV).ok(), config_value)
}

fn resolve_with_env(env_value: Option<String>, config_value: Option<&str>) -> Option<ResolvedSecret> {
    if let Some(value) = env_value
        && !value.is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(CLIENT_SECRET_ENV.to_string()),
        });
    }

    config_value.map(|v| ResolvedSecret {
        value: v.to_string(),
        source: SecretSource::ConfigFile,
    })
}
