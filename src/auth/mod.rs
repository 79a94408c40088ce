//! Login and session-synchronization engine.
//!
//! One login attempt flows through this module: [`request_authorization`]
//! obtains the provider URL and seed cookie, the [`NavigationInterceptor`]
//! guards the embedded browser showing the provider flow, the [`LoginPoller`]
//! watches for out-of-band identity verification to complete, and a success
//! lands in the [`SessionStore`] that the rest of the app reads.

mod authorize;
mod cookies;
mod error;
mod navigation;
mod poller;
mod session;
mod storage;

pub use authorize::{AuthorizationTicket, logout, request_authorization};
pub use cookies::SeedCookie;
pub use error::AuthError;
pub use navigation::{NavigationDecision, NavigationInterceptor};
pub use poller::{HttpLoginCheck, LoginCheck, LoginPoller, PollHandle, PollOutcome};
pub use session::{Session, SessionStore};
pub use storage::{SessionStorage, StorageError};
