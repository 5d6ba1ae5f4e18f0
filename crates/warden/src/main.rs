//! Warden - keeps an OAuth 2.0 token fresh and hands it to local programs
//!
//! Main entry point for the warden CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{init, run, token};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Warden - encrypted OAuth 2.0 token vault with local distribution
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Extra config file, layered over the user config
    #[arg(long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a session: new keypair, authorize, save
    Init(init::InitArgs),

    /// Keep the token refreshed and distribute it until interrupted
    Run(run::RunArgs),

    /// Print the current access token, refreshing it first if due
    Token(token::TokenArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr so stdout stays clean) + rotating JSON file
    let filter = if cli.debug {
        "warden=trace,warden_oauth=trace,warden_config=trace,info"
    } else if cli.verbose {
        "warden=debug,warden_oauth=debug,warden_config=debug,info"
    } else {
        "warden=info,warden_oauth=info,warden_config=info,warn"
    };

    let log_dir = warden_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "warden.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "warden=debug,warden_oauth=debug,warden_config=debug,info",
                )),
        )
        .init();

    let loaded = warden_config::load_config(None, cli.config.as_deref())?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.loaded_from(), "Configuration loaded");

    let ctx = commands::Context {
        config: loaded.config,
        verbose: cli.verbose || cli.debug,
    };

    match cli.command {
        Commands::Init(args) => init::run(args, &ctx).await,
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Token(args) => token::run(args, &ctx).await,
    }
}
