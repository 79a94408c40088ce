//! Backend and identity-provider configuration for the login engine.
//!
//! The deep-link prefix, fallback marker, and suffix length describe the
//! identity provider's link format. They are provider-specific constants, not
//! general URL-parsing rules, so they stay configurable.

use std::time::Duration;

/// Default scheme prefix of the identity provider's app deep links.
pub const DEFAULT_DEEP_LINK_PREFIX: &str = "intent://link.id.gov.sg/";

/// Default marker preceding the embedded web fallback URL in a deep link.
pub const DEFAULT_FALLBACK_MARKER: &str = "browser_fallback_url=";

/// Default length of the fixed trailing suffix after the fallback URL.
///
/// The provider's link format terminates the fallback parameter with a
/// fixed-width token (`;end`). This is an external-format assumption.
pub const DEFAULT_FALLBACK_SUFFIX_LEN: usize = 4;

/// Default interval between login-confirmation checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default hard upper bound on one polling run.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming the backend base URL.
pub const API_URL_ENV: &str = "FAREPLAY_API_URL";

/// Environment variable naming the registered post-login redirect URL.
pub const REDIRECT_URL_ENV: &str = "FAREPLAY_REDIRECT_URL";

/// Errors building an [`AuthConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The backend base URL is not an absolute HTTP(S) URL.
    #[error("invalid backend base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The offending URL string.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Configuration consumed by the login engine.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    base_url: String,
    redirect_url: String,
    deep_link_prefix: String,
    fallback_marker: String,
    fallback_suffix_len: usize,
    poll_interval: Duration,
    poll_timeout: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl AuthConfig {
    /// Creates a configuration for the given backend base URL, with provider
    /// and timing defaults.
    ///
    /// A trailing slash on the base URL is trimmed so endpoint paths can be
    /// appended uniformly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] when the base URL is not an
    /// absolute `http`/`https` URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();

        let parsed = url::Url::parse(&base_url).map_err(|error| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: error.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            redirect_url: String::new(),
            deep_link_prefix: DEFAULT_DEEP_LINK_PREFIX.to_string(),
            fallback_marker: DEFAULT_FALLBACK_MARKER.to_string(),
            fallback_suffix_len: DEFAULT_FALLBACK_SUFFIX_LEN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        })
    }

    /// Sets the registered post-login redirect URL.
    #[must_use]
    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = redirect_url.into();
        self
    }

    /// Overrides the identity provider's deep-link format constants.
    #[must_use]
    pub fn with_deep_link_format(
        mut self,
        prefix: impl Into<String>,
        marker: impl Into<String>,
        suffix_len: usize,
    ) -> Self {
        self.deep_link_prefix = prefix.into();
        self.fallback_marker = marker.into();
        self.fallback_suffix_len = suffix_len;
        self
    }

    /// Overrides the polling interval and hard timeout.
    #[must_use]
    pub fn with_poll_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// The backend base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The registered post-login redirect URL (may be empty when none is
    /// registered).
    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// The identity provider's deep-link scheme prefix.
    #[must_use]
    pub fn deep_link_prefix(&self) -> &str {
        &self.deep_link_prefix
    }

    /// The marker preceding the fallback URL inside a deep link.
    #[must_use]
    pub fn fallback_marker(&self) -> &str {
        &self.fallback_marker
    }

    /// Length of the fixed trailing suffix after the fallback URL.
    #[must_use]
    pub fn fallback_suffix_len(&self) -> usize {
        self.fallback_suffix_len
    }

    /// Interval between login-confirmation checks.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Hard upper bound on one polling run.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// HTTP connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// HTTP read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}
