//! CLI module
//!
//! Command-line interface over the provider clients.
//!
//! # Commands
//!
//! - `backupify-users` - List protected users and their storage
//! - `okta-user` - Look up an Okta user
//! - `google-user` - Look up a Google Workspace user

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
