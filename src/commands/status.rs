//! Status command handler: report the stored session state.

use anyhow::{Result, anyhow};

use fareplay_auth::{AuthConfig, SessionStorage, SessionStore};

pub fn run_status_command(config: &AuthConfig) -> Result<()> {
    let storage =
        SessionStorage::open_default().map_err(|error| anyhow!("Session storage: {error}"))?;
    let store = SessionStore::open(config.base_url(), storage)
        .map_err(|error| anyhow!("Session storage: {error}"))?;

    if store.is_authenticated() {
        println!("Logged in to {}.", config.base_url());
    } else {
        println!("Not logged in to {}.", config.base_url());
    }

    Ok(())
}
