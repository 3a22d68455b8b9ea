//! Credentials module
//!
//! Supports: API Key, Bearer, Custom Headers, Service Account JWT
//!
//! Credential acquisition lives behind the `Credentialer` trait; the
//! request executor only consumes the headers it returns.

mod credentials;
mod types;

pub use credentials::{Credentialer, ServiceAccountCredentials, StaticCredentials};
pub use types::{AuthConfig, CachedToken, ServiceAccountKey};
