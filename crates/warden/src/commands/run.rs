//! Run command - keep the token fresh and distribute it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Args;
use tokio_util::sync::CancellationToken;
use warden_config::expand_home;
use warden_oauth::{FileWriterDaemon, HttpOAuthClient, TokenRefresher, TokenState};

use super::{Context, cancel_on_ctrl_c, unlock_session};

/// Re-check at least this often.
const MAX_SLEEP: Duration = Duration::from_secs(15 * 60);

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Session file to unlock
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Keep the access token written to this file
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Serve the access token on this Unix socket
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Refresh when this many seconds or fewer remain
    #[arg(long)]
    pub threshold: Option<i64>,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let path = ctx.session_file(args.session_file)?;
    let distribution = ctx.config.distribution();
    let token_file = args
        .token_file
        .or(distribution.token_file)
        .map(|p| expand_home(&p));
    let socket_path = args
        .socket
        .or(distribution.socket_path)
        .map(|p| expand_home(&p));
    let refresh = ctx.config.refresh();

    let loaded = unlock_session(&path).await?;
    let token = loaded
        .token
        .ok_or_else(|| anyhow!("Session {} holds no token; run 'warden init'", path.display()))?;

    let state = Arc::new(TokenState::with_token(token));
    let mut refresher = TokenRefresher::new(
        state.clone(),
        Arc::new(HttpOAuthClient::new()),
        loaded.vault,
    )
    .with_threshold(args.threshold.unwrap_or(refresh.threshold_secs));

    let mut writer = token_file.map(|p| FileWriterDaemon::new(p, state.clone()));
    if let Some(writer) = writer.as_mut() {
        writer.start()?;
        if ctx.verbose {
            println!("Writing access token to {}", writer.path().display());
        }
    }

    #[cfg(unix)]
    let mut socket = match socket_path {
        Some(p) => Some(start_socket(p, state.clone(), ctx.verbose)?),
        None => None,
    };
    #[cfg(not(unix))]
    if socket_path.is_some() {
        anyhow::bail!("Unix socket distribution is not available on this platform");
    }

    let shutdown = cancel_on_ctrl_c();
    refresh_loop(
        &mut refresher,
        Duration::from_secs(refresh.retry_secs),
        &shutdown,
    )
    .await;

    state.close();
    if let Some(writer) = writer.as_mut() {
        writer.stop().await?;
    }
    #[cfg(unix)]
    if let Some(socket) = socket.as_mut() {
        socket.stop().await?;
    }
    Ok(())
}

#[cfg(unix)]
fn start_socket(
    path: PathBuf,
    state: Arc<TokenState>,
    verbose: bool,
) -> Result<warden_oauth::SocketTokenServer> {
    let mut server = warden_oauth::SocketTokenServer::new(path, state);
    server.start()?;
    if verbose {
        println!("Serving access token on {}", server.path().display());
    }
    Ok(server)
}

/// Refresh whenever due until `shutdown` fires. Failures are logged and
/// retried after `retry`.
async fn refresh_loop(
    refresher: &mut TokenRefresher,
    retry: Duration,
    shutdown: &CancellationToken,
) {
    loop {
        let delay = match refresher.refresh_if_due().await {
            Ok(_) => until_due(refresher, retry),
            Err(e) => {
                tracing::error!(error = %e, retry_secs = retry.as_secs(), "Token refresh failed");
                retry
            }
        };
        tracing::debug!(sleep_secs = delay.as_secs(), "Waiting for next refresh");

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn until_due(refresher: &TokenRefresher, retry: Duration) -> Duration {
    refresh_delay(
        refresher.next_refresh_at().ok(),
        chrono::Utc::now().timestamp(),
        retry,
    )
}

/// Sleep before the next refresh attempt. A token that is already due
/// right after refreshing (lifetime within the threshold) waits `retry`
/// rather than spinning against the token endpoint.
fn refresh_delay(next_at: Option<i64>, now: i64, retry: Duration) -> Duration {
    match next_at {
        Some(at) if at > now => Duration::from_secs((at - now) as u64).min(MAX_SLEEP),
        Some(_) => {
            tracing::warn!(
                retry_secs = retry.as_secs(),
                "Token lifetime is within the refresh threshold; lower --threshold"
            );
            retry
        }
        None => retry,
    }
}
