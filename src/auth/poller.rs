//! Timed, cancellable login-confirmation polling.
//!
//! After the embedded browser opens the authorization URL, identity
//! verification completes out of band. The poller asks the backend on a fixed
//! interval whether the seed cookie is now authenticated, under a hard
//! deadline, and owns both timers as one cancellable task: success, timeout,
//! and cancellation all tear the run down together, so neither timer can
//! outlive the other.
//!
//! Poll attempts are strictly serialized. Each response is awaited before the
//! next tick, and the next check is rescheduled a full interval after the
//! previous response completes, so ticks that came due behind a slow response
//! are dropped rather than fired back-to-back. One run moves
//! `Polling -> {Succeeded, TimedOut, Cancelled}` and every terminal state is
//! final.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};

use super::cookies::SeedCookie;
use super::session::SessionStore;

/// Backend query for whether a seed cookie has been verified.
///
/// A trait seam so tests can drive the polling state machine with scripted
/// backends under paused time.
#[async_trait]
pub trait LoginCheck: Send + Sync {
    /// Returns true when the backend reports the cookie as verified.
    ///
    /// Transport errors and non-success statuses are both "not yet": the
    /// poller retries them in place without surfacing anything.
    async fn is_logged_in(&self, cookie: &SeedCookie) -> bool;
}

/// Production check: `GET /auth/is_logged_in` with the seed cookie attached.
pub struct HttpLoginCheck {
    client: Client,
    base_url: String,
}

impl HttpLoginCheck {
    /// Creates a check against the given backend.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LoginCheck for HttpLoginCheck {
    async fn is_logged_in(&self, cookie: &SeedCookie) -> bool {
        let result = self
            .client
            .get(format!("{}/auth/is_logged_in", self.base_url))
            .header(header::COOKIE, cookie.header_value())
            .send()
            .await;

        match result {
            // Status alone signals success; the body is ignored. This cannot
            // distinguish "not yet verified" from a temporarily erroring
            // backend, which is the backend's existing contract.
            Ok(response) => response.status() == StatusCode::OK,
            Err(error) => {
                debug!(error = %error.without_url(), "login check request failed; retrying");
                false
            }
        }
    }
}

/// Terminal state of one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backend confirmed the cookie; the session store was updated.
    Succeeded,
    /// The hard deadline elapsed; the session was left untouched.
    TimedOut,
    /// The run was cancelled before either of the above.
    Cancelled,
}

/// Handle to an in-flight polling run.
///
/// Dropping the handle without awaiting the outcome also cancels the run, so
/// a torn-down caller cannot leak the polling loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Cancels the run: interval and deadline stop together, no further
    /// request is issued, and a response already in flight cannot mutate the
    /// session. Idempotent; cancelling a finished run is a no-op.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Waits for the run to reach its terminal state.
    pub async fn outcome(&mut self) -> PollOutcome {
        (&mut self.task).await.unwrap_or(PollOutcome::Cancelled)
    }

    /// Returns true once the run has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// One login attempt's polling configuration.
pub struct LoginPoller {
    check: Arc<dyn LoginCheck>,
    session: Arc<SessionStore>,
    interval: Duration,
    timeout: Duration,
}

impl LoginPoller {
    /// Creates a poller with the default 3-second interval and 120-second
    /// hard timeout.
    #[must_use]
    pub fn new(check: Arc<dyn LoginCheck>, session: Arc<SessionStore>) -> Self {
        Self {
            check,
            session,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Overrides the poll interval and hard timeout.
    #[must_use]
    pub fn with_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.interval = interval;
        self.timeout = timeout;
        self
    }

    /// Starts polling with the given seed cookie.
    ///
    /// At most one run should exist per login attempt; each call spawns an
    /// independent run owning its own timers.
    #[must_use]
    pub fn spawn(self, cookie: SeedCookie) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            self.check,
            self.session,
            cookie,
            self.interval,
            self.timeout,
            cancel_rx,
        ));

        PollHandle { cancel_tx, task }
    }
}

async fn poll_loop(
    check: Arc<dyn LoginCheck>,
    session: Arc<SessionStore>,
    cookie: SeedCookie,
    every: Duration,
    limit: Duration,
    mut cancel_rx: watch::Receiver<bool>,
) -> PollOutcome {
    let deadline = Instant::now() + limit;
    // First check fires one interval after start, matching the flow where the
    // user has only just been handed the provider page.
    let mut ticker = time::interval_at(Instant::now() + every, every);

    let mut attempt: u32 = 0;
    loop {
        tokio::select! {
            changed = cancel_rx.changed() => {
                // A closed channel means the handle was dropped; treat it the
                // same as an explicit cancel.
                if changed.is_err() || *cancel_rx.borrow() {
                    debug!(attempt, "login polling cancelled");
                    return PollOutcome::Cancelled;
                }
            }
            () = time::sleep_until(deadline) => {
                info!(attempt, "login polling timed out; session left unauthenticated");
                return PollOutcome::TimedOut;
            }
            _ = ticker.tick() => {
                attempt += 1;
                // Awaited inline, so polls serialize.
                let confirmed = check.is_logged_in(&cookie).await;

                // A cancel that arrived while the request was in flight wins
                // over the response.
                if *cancel_rx.borrow() {
                    debug!(attempt, "login polling cancelled during in-flight check");
                    return PollOutcome::Cancelled;
                }

                if confirmed {
                    info!(attempt, "login confirmed");
                    if let Err(error) = session.set_session(Some(cookie)) {
                        warn!(error = %error, "session confirmed but persisting it failed");
                    }
                    return PollOutcome::Succeeded;
                }

                debug!(attempt, "login not yet confirmed");
                // Reschedule from now: a slow response pushes the next check a
                // full interval out instead of letting an overdue tick fire
                // immediately.
                ticker.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tempfile::TempDir;

    use super::*;

    const BASE_URL: &str = "https://api.fareplay.example";

    /// Scripted backend: fails `fail_first` checks, then succeeds, with an
    /// optional per-check response delay.
    struct ScriptedCheck {
        fail_first: u32,
        delay: Duration,
        calls: AtomicU32,
    }

    impl ScriptedCheck {
        fn succeeding_after(fail_first: u32) -> Arc<Self> {
            Arc::new(Self {
                fail_first,
                delay: Duration::ZERO,
                calls: AtomicU32::new(0),
            })
        }

        fn never_succeeding() -> Arc<Self> {
            Self::succeeding_after(u32::MAX)
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                fail_first: 0,
                delay,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LoginCheck for ScriptedCheck {
        async fn is_logged_in(&self, _cookie: &SeedCookie) -> bool {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            call >= self.fail_first
        }
    }

    fn test_store(dir: &TempDir) -> Arc<SessionStore> {
        let storage = super::super::storage::SessionStorage::at_path(
            dir.path().join("sessions.enc"),
            "test-key",
        );
        Arc::new(SessionStore::open(BASE_URL, storage).unwrap())
    }

    fn seed() -> SeedCookie {
        SeedCookie::parse("connect.sid=abc123")
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_succeeds_after_transient_failures() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        let check = ScriptedCheck::succeeding_after(3);

        let mut handle = LoginPoller::new(check.clone(), store.clone())
            .with_timing(Duration::from_secs(3), Duration::from_secs(120))
            .spawn(seed());

        assert_eq!(handle.outcome().await, PollOutcome::Succeeded);
        assert!(store.is_authenticated());
        assert_eq!(store.session().cookie(), Some(&seed()));
        // 3 failing checks plus the succeeding one, then nothing more
        assert_eq!(check.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_without_touching_session() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        let check = ScriptedCheck::never_succeeding();

        let mut handle = LoginPoller::new(check.clone(), store.clone())
            .with_timing(Duration::from_secs(3), Duration::from_secs(120))
            .spawn(seed());

        assert_eq!(handle.outcome().await, PollOutcome::TimedOut);
        assert!(!store.is_authenticated());

        // Request count stops growing after the deadline
        let calls_at_timeout = check.calls();
        assert!(calls_at_timeout <= 40, "calls: {calls_at_timeout}");
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(check.calls(), calls_at_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_future_ticks() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        let check = ScriptedCheck::never_succeeding();

        let mut handle = LoginPoller::new(check.clone(), store.clone())
            .with_timing(Duration::from_secs(3), Duration::from_secs(120))
            .spawn(seed());

        // Let two checks happen, then cancel
        time::sleep(Duration::from_secs(7)).await;
        handle.cancel();
        assert_eq!(handle.outcome().await, PollOutcome::Cancelled);

        let calls_at_cancel = check.calls();
        assert_eq!(calls_at_cancel, 2);
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(check.calls(), calls_at_cancel);
        assert!(!store.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_twice_is_noop() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        let check = ScriptedCheck::never_succeeding();

        let mut handle = LoginPoller::new(check, store)
            .with_timing(Duration::from_secs(3), Duration::from_secs(120))
            .spawn(seed());

        handle.cancel();
        handle.cancel();
        assert_eq!(handle.outcome().await, PollOutcome::Cancelled);
        // Cancelling an already-finished run is also a no-op
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_response_after_cancel_does_not_mutate_session() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        // The check would succeed, but only after a long in-flight delay
        let check = ScriptedCheck::slow(Duration::from_secs(10));

        let mut handle = LoginPoller::new(check.clone(), store.clone())
            .with_timing(Duration::from_secs(3), Duration::from_secs(120))
            .spawn(seed());

        // First check starts at t=3s and stays in flight until t=13s;
        // cancel lands mid-flight
        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(check.calls(), 1);
        handle.cancel();

        assert_eq!(handle.outcome().await, PollOutcome::Cancelled);
        assert!(!store.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_run() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        let check = ScriptedCheck::never_succeeding();

        let handle = LoginPoller::new(check.clone(), store)
            .with_timing(Duration::from_secs(3), Duration::from_secs(120))
            .spawn(seed());

        drop(handle);
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(check.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_responses_serialize_polls() {
        let tempdir = TempDir::new().unwrap();
        let store = test_store(&tempdir);
        // Each check takes 7s against a 3s interval: ticks that came due
        // behind the in-flight response must not fire back-to-back
        let check = Arc::new(ScriptedCheck {
            fail_first: u32::MAX,
            delay: Duration::from_secs(7),
            calls: AtomicU32::new(0),
        });

        let mut handle = LoginPoller::new(check.clone(), store)
            .with_timing(Duration::from_secs(3), Duration::from_secs(29))
            .spawn(seed());

        assert_eq!(handle.outcome().await, PollOutcome::TimedOut);
        // Checks start at 3, 13, and 23: each reschedule lands a full
        // interval after the previous 7-second response, so three serialized
        // checks in 29 seconds, not nine interval slots
        assert_eq!(check.calls(), 3);
    }
}
