//! Thin client for the backend endpoints consumed outside the login engine.
//!
//! These calls attach the session cookie and pass response bodies through as
//! JSON; the backend does the heavy lifting (identity lookup, price
//! aggregation). Errors fold into the same taxonomy the login flow uses.

use reqwest::{Client, StatusCode, header};
use tracing::instrument;

use crate::auth::{AuthError, SeedCookie};

/// A geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Client for backend calls made with an authenticated session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the given backend.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetches the user's identity-provider profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ServerUnavailable`] on transport failure or a
    /// non-200 status.
    #[instrument(level = "debug", skip(self, cookie))]
    pub async fn user_info(&self, cookie: &SeedCookie) -> Result<serde_json::Value, AuthError> {
        let response = self
            .client
            .get(format!("{}/userinfo", self.base_url))
            .header(header::COOKIE, cookie.header_value())
            .send()
            .await?;

        Self::json_or_unavailable(response, "/userinfo").await
    }

    /// Fetches ride-price quotes for a start/end pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ServerUnavailable`] on transport failure or a
    /// non-200 status.
    #[instrument(level = "debug", skip(self, cookie))]
    pub async fn ride_prices(
        &self,
        cookie: &SeedCookie,
        start: LatLng,
        end: LatLng,
    ) -> Result<serde_json::Value, AuthError> {
        let response = self
            .client
            .get(format!("{}/prices", self.base_url))
            .header(header::COOKIE, cookie.header_value())
            .query(&[
                ("startLat", start.latitude),
                ("startLong", start.longitude),
                ("endLat", end.latitude),
                ("endLong", end.longitude),
            ])
            .send()
            .await?;

        Self::json_or_unavailable(response, "/prices").await
    }

    async fn json_or_unavailable(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<serde_json::Value, AuthError> {
        if response.status() != StatusCode::OK {
            return Err(AuthError::unavailable(format!(
                "unexpected status {} from {endpoint}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|error| AuthError::unavailable(format!("malformed body from {endpoint}: {error}")))
    }
}
