//! FarePlay Login Engine
//!
//! This library implements the login and session-synchronization engine for
//! the FarePlay ride-price comparison client: it obtains an identity-provider
//! authorization URL and session-seed cookie from the backend, decides which
//! embedded-browser navigations belong to the provider flow, polls the backend
//! until out-of-band identity verification completes, and maintains the
//! process-wide session that the rest of the app reads.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Cookie parsing, authorization request, navigation
//!   interception, login-confirmation polling, and session persistence
//! - [`api`] - Thin client for the backend endpoints consumed with a session
//!   cookie attached (user info, ride prices)
//! - [`config`] - Backend and identity-provider configuration
//! - [`http`] - Shared HTTP client construction policy

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod http;

// Re-export commonly used types
pub use auth::{
    AuthError, AuthorizationTicket, HttpLoginCheck, LoginCheck, LoginPoller, NavigationDecision,
    NavigationInterceptor, PollHandle, PollOutcome, SeedCookie, Session, SessionStorage,
    SessionStore, StorageError, logout, request_authorization,
};
pub use config::{AuthConfig, ConfigError};
