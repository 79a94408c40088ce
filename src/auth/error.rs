//! Error taxonomy for the login engine's network surface.

/// Errors returned by the authorization request, logout, and backend API
/// calls.
///
/// Polling errors are deliberately absent: per-attempt failures are retried in
/// place and only the terminal outcome of a run is observable.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Backend explicitly reports login is unavailable (HTTP 404).
    #[error("login is not configured on the backend")]
    NotConfigured,

    /// Network-level failure or unexpected status from the backend.
    #[error("authentication server unavailable: {reason}")]
    ServerUnavailable {
        /// Description of what failed (never contains cookie material).
        reason: String,
    },
}

impl AuthError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::ServerUnavailable {
            reason: reason.into(),
        }
    }
}

// Transport failures collapse into ServerUnavailable; the user-facing
// distinction is only "not configured" vs "server down".
impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::unavailable(error.without_url().to_string())
    }
}
