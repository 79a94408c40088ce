//! Login command handler: request authorization, poll until confirmed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use fareplay_auth::{
    AuthConfig, AuthError, HttpLoginCheck, LoginPoller, PollOutcome, SessionStorage, SessionStore,
    http, request_authorization,
};

pub async fn run_login_command(config: &AuthConfig) -> Result<()> {
    let client = http::build_http_client(config)?;

    let ticket = match request_authorization(&client, config.base_url()).await {
        Ok(ticket) => ticket,
        Err(AuthError::NotConfigured) => {
            bail!("Login is currently unavailable on this backend");
        }
        Err(error) => bail!("Could not reach the authentication server: {error}"),
    };

    info!(cookies = ticket.seed_cookie.len(), "authorization ticket obtained");
    println!("Open this URL in your browser and complete identity verification:");
    println!();
    println!("  {}", ticket.authorization_url);
    println!();

    let storage =
        SessionStorage::open_default().map_err(|error| anyhow!("Session storage: {error}"))?;
    let store = Arc::new(
        SessionStore::open(config.base_url(), storage)
            .map_err(|error| anyhow!("Session storage: {error}"))?,
    );

    let check = Arc::new(HttpLoginCheck::new(client, config.base_url()));
    let mut handle = LoginPoller::new(check, Arc::clone(&store))
        .with_timing(config.poll_interval(), config.poll_timeout())
        .spawn(ticket.seed_cookie);

    let spinner = waiting_spinner(config.poll_timeout());

    // Ctrl-C cancels the run instead of abandoning it mid-flight
    let outcome = tokio::select! {
        outcome = handle.outcome() => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match outcome {
        Some(outcome) => outcome,
        None => {
            handle.cancel();
            handle.outcome().await
        }
    };

    spinner.finish_and_clear();

    match outcome {
        PollOutcome::Succeeded => {
            info!("Logged in; session stored");
            println!("Logged in.");
            Ok(())
        }
        PollOutcome::TimedOut => {
            bail!(
                "Identity verification was not confirmed within {} seconds; try again",
                config.poll_timeout().as_secs()
            )
        }
        PollOutcome::Cancelled => bail!("Login cancelled"),
    }
}

fn waiting_spinner(timeout: Duration) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!(
        "Waiting for identity verification (up to {}s, Ctrl-C to cancel)",
        timeout.as_secs()
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
