//! CLI command handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use tokio_util::sync::CancellationToken;
use warden_config::{WardenConfig, default_session_file, expand_home, resolve_client_secret};
use warden_oauth::{ClientCredentials, LoadedSession, Registration, SessionVault, TerminalPrompt};

pub mod init;
pub mod run;
pub mod token;

/// Unlocks (and creates) sessions without prompting when set.
pub const PASSWORD_ENV: &str = "WARDEN_PASSWORD";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: WardenConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// The session file: flag, then config, then the platform default.
    pub fn session_file(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        let path = match flag.or_else(|| self.config.session_file.clone()) {
            Some(path) => path,
            None => default_session_file()?,
        };
        Ok(expand_home(&path))
    }

    pub fn registration(&self) -> Result<Registration> {
        let registration = self
            .config
            .registration()
            .context("No [registration] section configured")?;
        Ok(Registration {
            authorize_endpoint: registration.authorize_endpoint.clone(),
            token_endpoint: registration.token_endpoint.clone(),
            redirect_uri: registration.redirect_uri.clone(),
            scope: registration.scope.clone(),
        })
    }

    pub fn client_credentials(&self) -> Result<ClientCredentials> {
        let client = self
            .config
            .client()
            .context("No [client] section configured")?;
        let secret = resolve_client_secret(client.client_secret.as_deref());
        if let Some(resolved) = &secret {
            tracing::debug!(source = %resolved.source, "Client secret resolved");
        }
        Ok(ClientCredentials {
            client_id: client.client_id.clone(),
            client_secret: secret.map(|s| s.value),
        })
    }
}

fn password_from_env() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}

/// Read and unlock a session file, prompting on the terminal unless
/// `WARDEN_PASSWORD` is set.
pub async fn unlock_session(path: &Path) -> Result<LoadedSession> {
    if !path.exists() {
        bail!(
            "No session at {}; run 'warden init' first",
            path.display()
        );
    }

    let path = path.to_path_buf();
    let loaded = tokio::task::spawn_blocking(move || match password_from_env() {
        Some(password) => SessionVault::open(&path, &password),
        None => SessionVault::load(&path, &mut TerminalPrompt),
    })
    .await??;
    Ok(loaded)
}

/// Create a vault with a new keypair.
pub async fn create_vault(
    registration: Registration,
    client: ClientCredentials,
) -> Result<SessionVault> {
    let vault = tokio::task::spawn_blocking(move || match password_from_env() {
        Some(password) => SessionVault::with_password(registration, client, &password),
        None => SessionVault::create(registration, client, &mut TerminalPrompt),
    })
    .await??;
    Ok(vault)
}

/// A token cancelled on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted");
            cancel.cancel();
        }
    });
    token
}
