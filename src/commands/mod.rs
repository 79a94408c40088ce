//! Command handlers for the CLI entry point.

mod login;
mod logout;
mod status;

pub use login::run_login_command;
pub use logout::run_logout_command;
pub use status::run_status_command;
