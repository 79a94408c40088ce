//! Logout command handler: best-effort backend logout, then clear the
//! stored session.

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use fareplay_auth::{AuthConfig, SessionStorage, SessionStore, http, logout};

pub async fn run_logout_command(config: &AuthConfig) -> Result<()> {
    let storage =
        SessionStorage::open_default().map_err(|error| anyhow!("Session storage: {error}"))?;
    let store = SessionStore::open(config.base_url(), storage)
        .map_err(|error| anyhow!("Session storage: {error}"))?;

    let Some(cookie) = store.session().cookie().cloned() else {
        info!("No stored session for this backend");
        println!("Not logged in.");
        return Ok(());
    };

    // Best-effort: the local session is cleared whether or not the backend
    // call succeeds
    let client = http::build_http_client(config)?;
    if let Err(error) = logout(&client, config.base_url(), &cookie).await {
        warn!(error = %error, "backend logout failed; clearing local session anyway");
    }

    store
        .set_session(None)
        .map_err(|error| anyhow!("Failed to clear stored session: {error}"))?;

    info!("Session cleared");
    println!("Logged out.");
    Ok(())
}
