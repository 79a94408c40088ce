//! Embedded-browser navigation interception.
//!
//! The embedded browser hosting the identity-provider flow asks the
//! interceptor, once per navigation attempt, what to do with the candidate
//! URL. The decision is pure; the host executes the side effects (stopping
//! the current load, opening an external handler) based on the returned tag.
//! The browser must never be left trying to load a device-only URI scheme,
//! and must never lose a legitimate provider redirect.

use tracing::debug;

use crate::config::AuthConfig;

/// Outcome of a navigation-interception decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Load the URL inside the embedded browser.
    Allow,
    /// Stop the current load and open the given URL in the device's default
    /// external handler.
    BlockAndOpenExternal(String),
    /// Stop the current load and take no further action. The user can retry
    /// the login flow from scratch.
    BlockSilently,
}

/// Per-login-attempt navigation policy for the embedded browser.
#[derive(Debug, Clone)]
pub struct NavigationInterceptor {
    authorization_url: String,
    redirect_url: String,
    deep_link_prefix: String,
    fallback_marker: String,
    fallback_suffix_len: usize,
}

impl NavigationInterceptor {
    /// Creates an interceptor for one login attempt.
    ///
    /// `authorization_url` is the provider URL the browser was opened with;
    /// the redirect URL and deep-link format come from the configuration.
    #[must_use]
    pub fn new(config: &AuthConfig, authorization_url: impl Into<String>) -> Self {
        Self {
            authorization_url: authorization_url.into(),
            redirect_url: config.redirect_url().to_string(),
            deep_link_prefix: config.deep_link_prefix().to_string(),
            fallback_marker: config.fallback_marker().to_string(),
            fallback_suffix_len: config.fallback_suffix_len(),
        }
    }

    /// Decides what the embedded browser should do with a navigation attempt.
    ///
    /// Policy, in order: the authorization URL and the registered redirect
    /// URL always load; a provider deep link is blocked, redirecting to its
    /// embedded web fallback when one can be extracted; every other URL is a
    /// normal provider-flow page and loads.
    #[must_use]
    pub fn decide(&self, candidate_url: &str) -> NavigationDecision {
        if candidate_url == self.authorization_url
            || (!self.redirect_url.is_empty() && candidate_url == self.redirect_url)
        {
            return NavigationDecision::Allow;
        }

        if candidate_url.starts_with(&self.deep_link_prefix) {
            return match self.extract_fallback_url(candidate_url) {
                Some(fallback) => {
                    debug!(fallback = %fallback, "deep link blocked; opening web fallback externally");
                    NavigationDecision::BlockAndOpenExternal(fallback)
                }
                None => {
                    debug!("deep link blocked; no usable web fallback");
                    NavigationDecision::BlockSilently
                }
            };
        }

        NavigationDecision::Allow
    }

    /// Extracts the web fallback URL embedded in a provider deep link.
    ///
    /// The fallback is the substring after the marker token, with the
    /// provider's fixed-length trailing suffix stripped. The slice length is
    /// an assumption about the provider's link format, not URL parsing.
    fn extract_fallback_url(&self, url: &str) -> Option<String> {
        let (_, tail) = url.split_once(self.fallback_marker.as_str())?;
        let end = tail.len().checked_sub(self.fallback_suffix_len)?;
        let fallback = tail.get(..end)?;
        if fallback.is_empty() {
            return None;
        }
        Some(fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_URL: &str = "https://id.provider.example/authorize?client=fareplay&state=xyz";
    const REDIRECT_URL: &str = "https://app.fareplay.example/landing";

    fn interceptor() -> NavigationInterceptor {
        let config = AuthConfig::new("https://api.fareplay.example")
            .unwrap()
            .with_redirect_url(REDIRECT_URL);
        NavigationInterceptor::new(&config, AUTH_URL)
    }

    #[test]
    fn test_authorization_url_is_allowed() {
        assert_eq!(interceptor().decide(AUTH_URL), NavigationDecision::Allow);
    }

    #[test]
    fn test_redirect_url_is_allowed() {
        assert_eq!(interceptor().decide(REDIRECT_URL), NavigationDecision::Allow);
    }

    #[test]
    fn test_ordinary_provider_page_is_allowed() {
        let decision = interceptor().decide("https://id.provider.example/login/step2");
        assert_eq!(decision, NavigationDecision::Allow);
    }

    #[test]
    fn test_deep_link_blocks_and_opens_fallback() {
        let url = "intent://link.id.gov.sg/?foo=bar&browser_fallback_url=https://example.com/verify;end";
        let decision = interceptor().decide(url);
        assert_eq!(
            decision,
            NavigationDecision::BlockAndOpenExternal("https://example.com/verify".to_string())
        );
    }

    #[test]
    fn test_deep_link_fallback_strips_fixed_suffix_exactly() {
        // The trailing 4 characters are stripped whatever they are
        let url = "intent://link.id.gov.sg/?browser_fallback_url=https://example.com/xxxx";
        let decision = interceptor().decide(url);
        assert_eq!(
            decision,
            NavigationDecision::BlockAndOpenExternal("https://example.com/".to_string())
        );
    }

    #[test]
    fn test_deep_link_without_marker_blocks_silently() {
        let url = "intent://link.id.gov.sg/?foo=bar";
        assert_eq!(interceptor().decide(url), NavigationDecision::BlockSilently);
    }

    #[test]
    fn test_deep_link_with_fallback_shorter_than_suffix_blocks_silently() {
        let url = "intent://link.id.gov.sg/?browser_fallback_url=ab";
        assert_eq!(interceptor().decide(url), NavigationDecision::BlockSilently);
    }

    #[test]
    fn test_deep_link_with_empty_stripped_fallback_blocks_silently() {
        // Exactly the suffix remains after the marker, so stripping leaves nothing
        let url = "intent://link.id.gov.sg/?browser_fallback_url=;end";
        assert_eq!(interceptor().decide(url), NavigationDecision::BlockSilently);
    }

    #[test]
    fn test_unregistered_redirect_url_still_allowed_as_flow_page() {
        let config = AuthConfig::new("https://api.fareplay.example").unwrap();
        let interceptor = NavigationInterceptor::new(&config, AUTH_URL);
        // Without a registered redirect URL, a non-deep-link URL falls through to Allow
        let decision = interceptor.decide("https://somewhere.example/after-login");
        assert_eq!(decision, NavigationDecision::Allow);
    }

    #[test]
    fn test_custom_deep_link_format() {
        let config = AuthConfig::new("https://api.fareplay.example")
            .unwrap()
            .with_deep_link_format("myid://", "next=", 2);
        let interceptor = NavigationInterceptor::new(&config, AUTH_URL);
        let decision = interceptor.decide("myid://open?next=https://a.example/b--");
        assert_eq!(
            decision,
            NavigationDecision::BlockAndOpenExternal("https://a.example/b".to_string())
        );
    }
}
