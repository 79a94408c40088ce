//! Authorization request and best-effort logout.
//!
//! `GET /auth/login` starts a login attempt: the backend answers with the
//! identity provider's authorization URL in the body and the session-seed
//! cookie in the `Set-Cookie` header. Both are needed before the embedded
//! browser or the poller can start.

use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::cookies::SeedCookie;
use super::error::AuthError;

/// Everything one login attempt needs: the provider page to open and the
/// seed cookie to poll with. Discarded at the end of the attempt.
#[derive(Debug, Clone)]
pub struct AuthorizationTicket {
    /// Provider URL the embedded browser must open.
    pub authorization_url: String,
    /// Session seed issued by the backend, not yet verified.
    pub seed_cookie: SeedCookie,
}

#[derive(Deserialize)]
struct AuthorizationBody {
    url: String,
}

/// Requests an authorization ticket from the backend.
///
/// # Errors
///
/// Returns [`AuthError::NotConfigured`] on HTTP 404 and
/// [`AuthError::ServerUnavailable`] on transport failure, any other status,
/// or a 200 response missing the seed cookie or the authorization URL.
#[instrument(level = "debug", skip(client))]
pub async fn request_authorization(
    client: &Client,
    base_url: &str,
) -> Result<AuthorizationTicket, AuthError> {
    let response = client.get(format!("{base_url}/auth/login")).send().await?;

    match response.status() {
        StatusCode::OK => {
            // First Set-Cookie header only; the backend issues a single seed
            let seed_cookie = response
                .headers()
                .get(header::SET_COOKIE)
                .and_then(|value| value.to_str().ok())
                .map(SeedCookie::parse)
                .ok_or_else(|| {
                    AuthError::unavailable("authorization response missing Set-Cookie header")
                })?;

            let body: AuthorizationBody = response.json().await.map_err(|error| {
                AuthError::unavailable(format!("malformed authorization response body: {error}"))
            })?;

            debug!(cookies = seed_cookie.len(), "authorization ticket obtained");
            Ok(AuthorizationTicket {
                authorization_url: body.url,
                seed_cookie,
            })
        }
        StatusCode::NOT_FOUND => Err(AuthError::NotConfigured),
        status => Err(AuthError::unavailable(format!(
            "unexpected status {status} from /auth/login"
        ))),
    }
}

/// Tells the backend to end the session for the given cookie.
///
/// Best-effort: callers clear the local session whether or not this succeeds
/// and surface failures only as a generic notice.
///
/// # Errors
///
/// Returns [`AuthError::ServerUnavailable`] on transport failure or a
/// non-success status.
#[instrument(level = "debug", skip(client, cookie))]
pub async fn logout(client: &Client, base_url: &str, cookie: &SeedCookie) -> Result<(), AuthError> {
    let response = client
        .get(format!("{base_url}/auth/logout"))
        .header(header::COOKIE, cookie.header_value())
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(AuthError::unavailable(format!(
            "unexpected status {} from /auth/logout",
            response.status()
        )))
    }
}
