//! Process-wide session state.
//!
//! The session is the single source of truth for "is the user logged in".
//! Only the login poller (on success) and an explicit logout write it;
//! everything else reads. Every mutation is mirrored to durable storage so a
//! restart restores an authenticated session without re-running the login
//! flow.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::cookies::SeedCookie;
use super::storage::{SessionStorage, StorageError};

/// Current authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// No verified session for this backend.
    Unauthenticated,
    /// Identity verification completed; the cookie authenticates API calls.
    Authenticated(SeedCookie),
}

impl Session {
    /// Returns true when a verified session exists.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The session cookie, when authenticated.
    #[must_use]
    pub fn cookie(&self) -> Option<&SeedCookie> {
        match self {
            Self::Authenticated(cookie) => Some(cookie),
            Self::Unauthenticated => None,
        }
    }
}

/// Holder of the process-wide [`Session`], mirrored to durable storage.
///
/// The in-memory value is behind a mutex so the store can be shared across
/// tasks and threads; the session is a single tagged value, so a plain
/// replace under the lock is the whole update.
#[derive(Debug)]
pub struct SessionStore {
    base_url: String,
    storage: SessionStorage,
    current: Mutex<Session>,
}

impl SessionStore {
    /// Opens the store for a backend base URL, restoring any persisted
    /// session for that base URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the persisted state exists but cannot be
    /// read.
    pub fn open(base_url: impl Into<String>, storage: SessionStorage) -> Result<Self, StorageError> {
        let base_url = base_url.into();
        let current = match storage.load(&base_url)? {
            Some(cookie) => {
                debug!(base_url = %base_url, "restored persisted session");
                Session::Authenticated(cookie)
            }
            None => Session::Unauthenticated,
        };

        Ok(Self {
            base_url,
            storage,
            current: Mutex::new(current),
        })
    }

    /// Replaces the session.
    ///
    /// `Some(cookie)` sets authenticated state; `None` clears it. The
    /// in-memory value changes first, then the durable mirror is written
    /// (stored for `Some`, removed for `None`).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the durable mirror cannot be written;
    /// the in-memory state has already changed in that case.
    pub fn set_session(&self, cookie: Option<SeedCookie>) -> Result<(), StorageError> {
        match cookie {
            Some(cookie) => {
                *self.lock() = Session::Authenticated(cookie.clone());
                self.storage.store(&self.base_url, &cookie)
            }
            None => {
                *self.lock() = Session::Unauthenticated;
                self.storage.remove(&self.base_url)
            }
        }
    }

    /// Synchronous read of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.lock().clone()
    }

    /// Returns true when the current session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    /// The backend base URL this store is bound to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // A poisoned lock only means a writer panicked mid-replace; the tagged
    // value itself is always whole, so recover it.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const BASE_URL: &str = "https://api.fareplay.example";

    fn storage_in(dir: &TempDir) -> SessionStorage {
        SessionStorage::at_path(dir.path().join("sessions.enc"), "test-key")
    }

    #[test]
    fn test_open_without_persisted_state_is_unauthenticated() {
        let tempdir = TempDir::new().unwrap();
        let store = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.session(), Session::Unauthenticated);
    }

    #[test]
    fn test_set_session_authenticates_and_exposes_cookie() {
        let tempdir = TempDir::new().unwrap();
        let store = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
        let cookie = SeedCookie::parse("connect.sid=abc");

        store.set_session(Some(cookie.clone())).unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.session().cookie(), Some(&cookie));
    }

    #[test]
    fn test_restart_restores_authenticated_session() {
        let tempdir = TempDir::new().unwrap();
        let cookie = SeedCookie::parse("connect.sid=abc; Path=/");

        {
            let store = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
            store.set_session(Some(cookie.clone())).unwrap();
        }

        // Simulated process restart: a fresh store over the same file
        let store = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.session().cookie(), Some(&cookie));
    }

    #[test]
    fn test_clear_then_restart_is_unauthenticated() {
        let tempdir = TempDir::new().unwrap();

        {
            let store = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
            store.set_session(Some(SeedCookie::parse("sid=a"))).unwrap();
            store.set_session(None).unwrap();
            assert!(!store.is_authenticated());
        }

        let store = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_stores_for_different_base_urls_are_independent() {
        let tempdir = TempDir::new().unwrap();
        let prod = SessionStore::open(BASE_URL, storage_in(&tempdir)).unwrap();
        prod.set_session(Some(SeedCookie::parse("sid=prod"))).unwrap();

        let staging =
            SessionStore::open("https://staging.fareplay.example", storage_in(&tempdir)).unwrap();
        assert!(!staging.is_authenticated());
        assert!(prod.is_authenticated());
    }
}
