//! Init command - create a new session.

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use warden_oauth::{AuthorizationFlow, HttpOAuthClient, redirect::stdin_lines};

use super::{Context, cancel_on_ctrl_c, create_vault};

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Session file to create
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Port for the local redirect listener (0 picks a free one)
    #[arg(long)]
    pub port: Option<u16>,

    /// Replace an existing session file
    #[arg(long)]
    pub force: bool,
}

/// Run the init command.
pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let registration = ctx.registration()?;
    let client = ctx.client_credentials()?;
    let path = ctx.session_file(args.session_file)?;
    let port = args.port.unwrap_or(ctx.config.redirect().port);

    if path.exists() && !args.force {
        bail!(
            "Session file {} already exists; pass --force to replace it",
            path.display()
        );
    }

    let mut vault = create_vault(registration.clone(), client.clone()).await?;

    let flow = AuthorizationFlow::begin(registration, client, port)
        .await
        .context("Failed to start authorization")?;
    if ctx.verbose {
        println!("Using redirect URI {}", flow.redirect_uri());
    }
    println!("{}", flow.instructions());

    let abort = cancel_on_ctrl_c();
    let oauth = HttpOAuthClient::new();
    let token = flow
        .complete(&oauth, stdin_lines(), &abort)
        .await
        .context("Authorization failed")?;

    vault
        .save(&token, Some(&path))
        .context("Failed to save session")?;

    println!();
    println!("Authorization successful!");
    println!("Session saved to {}", path.display());
    Ok(())
}
