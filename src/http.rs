//! Shared HTTP client construction policy.
//!
//! Centralizes networking defaults so the authorization request, the login
//! poller, and the backend API client stay consistent on timeouts and
//! user-agent.

use reqwest::Client;

use crate::config::AuthConfig;

/// User-agent sent on every backend request.
pub const USER_AGENT: &str = concat!("fareplay-auth/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client used for all backend calls.
///
/// Cookies are attached explicitly per request (the seed cookie is the
/// credential being polled, not ambient jar state), so no cookie store is
/// configured.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] when client construction fails.
pub fn build_http_client(config: &AuthConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.read_timeout())
        .user_agent(USER_AGENT)
        .build()
}
