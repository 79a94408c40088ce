//! CLI entry point for FarePlay login and session management.

use std::env;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use fareplay_auth::{AuthConfig, config};
use tracing::debug;

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let auth_config = resolve_config(&args)?;

    match args.command {
        Command::Login {
            poll_interval,
            timeout,
        } => {
            let auth_config = auth_config.with_poll_timing(
                Duration::from_secs(poll_interval),
                Duration::from_secs(timeout),
            );
            commands::run_login_command(&auth_config).await
        }
        Command::Logout => commands::run_logout_command(&auth_config).await,
        Command::Status => commands::run_status_command(&auth_config),
    }
}

fn resolve_config(args: &Args) -> Result<AuthConfig> {
    let base_url = match &args.api_url {
        Some(url) => url.clone(),
        None => match env::var(config::API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => bail!(
                "No backend configured: pass --api-url or set {}",
                config::API_URL_ENV
            ),
        },
    };

    let mut auth_config = AuthConfig::new(base_url)?;
    if let Ok(redirect_url) = env::var(config::REDIRECT_URL_ENV) {
        auth_config = auth_config.with_redirect_url(redirect_url);
    }

    Ok(auth_config)
}
