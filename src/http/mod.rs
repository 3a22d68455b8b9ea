//! HTTP request path
//!
//! Provides the rate-limited, credentialed request executor.
//!
//! # Features
//!
//! - **Quota Limiting**: Fixed-budget or provider reset-aware token budget
//! - **Pluggable Transport**: Bytes-on-the-wire behind the `Transport` trait
//! - **Typed Decoding**: JSON responses decoded into caller types
//! - **Authentication**: Headers supplied by a `Credentialer`

mod executor;
mod rate_limit;
mod transport;

pub use executor::{RequestExecutor, JSON};
pub(crate) use rate_limit::deadline_after;
pub use rate_limit::{QuotaSignal, RateLimiter, RateLimiterConfig};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportConfig};

#[cfg(test)]
mod tests;
