//! Token command - print the current access token.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use clap::Args;
use warden_oauth::{HttpOAuthClient, TokenRefresher, TokenState};

use super::{Context, unlock_session};

/// Arguments for the token command.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Session file to unlock
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Print the stored token even if it is due for a refresh
    #[arg(long)]
    pub no_refresh: bool,
}

/// Run the token command.
pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    let path = ctx.session_file(args.session_file)?;
    let loaded = unlock_session(&path).await?;
    let token = loaded
        .token
        .ok_or_else(|| anyhow!("Session {} holds no token; run 'warden init'", path.display()))?;

    let state = Arc::new(TokenState::with_token(token));
    if !args.no_refresh {
        let mut refresher = TokenRefresher::new(
            state.clone(),
            Arc::new(HttpOAuthClient::new()),
            loaded.vault,
        )
        .with_threshold(ctx.config.refresh().threshold_secs);
        refresher
            .refresh_if_due()
            .await
            .context("Token refresh failed")?;
    }

    println!("{}", state.access_token()?);
    Ok(())
}
