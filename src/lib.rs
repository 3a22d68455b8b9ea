// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pagewise
//!
//! A shared access layer for rate-limited, paginated JSON REST APIs.
//!
//! ## Features
//!
//! - **Rate Limiting**: Fixed budgets per window, or following the quota a
//!   provider reports in its response headers
//! - **Response Cache**: Time-to-live cache of complete results
//! - **Exhaustive Pagination**: Offset/length paging over DataTables-style
//!   envelopes until the reported total is reached
//! - **Size Normalization**: Parallel conversion of `"1.5 GB"`-style sizes
//!   into bytes, decimal or binary
//! - **Provider Clients**: Backupify, Okta and Google Workspace
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewise::config::Settings;
//! use pagewise::providers::BackupifyClient;
//!
//! #[tokio::main]
//! async fn main() -> pagewise::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let backupify = BackupifyClient::from_settings(&settings.backupify)?;
//!
//!     let users = backupify.users().all().await?;
//!     for user in backupify.users().larger_than(&users, 50e9).data {
//!         println!("{} uses {}", user.name, user.used_bytes);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │            Provider clients (Backupify, Okta, Google)        │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌────────────────┬────────────┴────────┬───────────────────────┐
//! │  Pagination    │   Response cache    │   Unit converter      │
//! └────────────────┴─────────────────────┴───────────────────────┘
//!                               │
//! ┌──────────────────────────────────────────────────────────────┐
//! │   Request executor: credentials → rate limiter → transport   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credential providers
pub mod auth;

/// Rate limiting, transport and request execution
pub mod http;

/// Response cache
pub mod cache;

/// Exhaustive pagination
pub mod pagination;

/// Size normalization
pub mod convert;

/// Settings from YAML or the environment
pub mod config;

/// Provider clients
pub mod providers;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use cache::ResponseCache;
pub use convert::{UnitBase, UnitConverter};
pub use http::{RateLimiter, RateLimiterConfig, RequestExecutor};
pub use pagination::{PageRequest, PageResponse, PaginationDriver};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
