//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};

/// Login and session management for the FarePlay backend.
///
/// The CLI stands in for the mobile shell: `login` obtains the identity
/// provider's authorization URL for you to open in a browser, then polls the
/// backend until verification completes and stores the session.
#[derive(Parser, Debug)]
#[command(name = "fareplay-auth")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Backend base URL (overrides FAREPLAY_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a login attempt and poll until the backend confirms it
    Login {
        /// Seconds between login-confirmation checks (1-60)
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..=60))]
        poll_interval: u64,

        /// Give up after this many seconds (10-600)
        #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(10..=600))]
        timeout: u64,
    },

    /// Clear the stored session (backend logout is attempted best-effort)
    Logout,

    /// Show whether a stored session exists for the configured backend
    Status,
}
