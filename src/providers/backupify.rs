//! Backupify backup inventory client
//!
//! Lists every protected user through the paginated user table and
//! normalizes each user's storage size to bytes before caching the result.

use super::{build_executor, build_url};
use crate::auth::{AuthConfig, Credentialer, StaticCredentials};
use crate::cache::{cache_key, ResponseCache};
use crate::config::BackupifySettings;
use crate::convert::{SizedRecord, UnitBase, UnitConverter};
use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, RequestExecutor};
use crate::pagination::{PageRequest, PageResponse, PaginationDriver, SortDirection};
use crate::types::{JsonValue, Method};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// User table endpoint, relative to the base URL
pub const USERS_ENDPOINT: &str = "customer-services/filter";

/// Columns requested from the user table
pub const USER_COLUMNS: [&str; 4] = ["name", "email", "latestSnap", "usedBytes"];

/// Default request budget
pub fn default_quota() -> RateLimiterConfig {
    RateLimiterConfig::per_minute(600)
}

// ============================================================================
// Records
// ============================================================================

/// A protected user and the storage their backups use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Last snapshot, as reported by the provider
    #[serde(default)]
    pub latest_snap: JsonValue,
    /// Human-readable size, e.g. `"1.5 GB"`
    #[serde(default)]
    pub used_bytes: String,
    /// Canonical byte count, set once `used_bytes` has been converted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_bytes_float: Option<f64>,
}

impl SizedRecord for User {
    fn size_text(&self) -> &str {
        &self.used_bytes
    }

    fn set_size_bytes(&mut self, bytes: f64) {
        self.used_bytes_float = Some(bytes);
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

/// All users, in the page envelope's shape
pub type Users = PageResponse<User>;

// ============================================================================
// Client
// ============================================================================

/// Client for the Backupify web API
#[derive(Debug, Clone)]
pub struct BackupifyClient {
    base_url: String,
    app_type: String,
    converter: UnitConverter,
    cache_ttl: Duration,
    pager: PaginationDriver,
}

impl BackupifyClient {
    /// Create a client over the given credentials
    pub fn new(settings: &BackupifySettings, credentials: Arc<dyn Credentialer>) -> Result<Self> {
        let base_url = settings
            .provider
            .base_url
            .clone()
            .ok_or_else(|| Error::missing_field("BACKUPIFY_BASE_URL"))?;
        let executor = build_executor(&settings.provider, credentials, &default_quota())?;
        Ok(Self::with_executor(settings, base_url, executor, ResponseCache::new()))
    }

    /// Create a client authenticated by the configured session headers
    pub fn from_settings(settings: &BackupifySettings) -> Result<Self> {
        let credentials = StaticCredentials::new(&AuthConfig::CustomHeaders {
            headers: settings.headers.clone(),
        })?;
        Self::new(settings, Arc::new(credentials))
    }

    /// Create a client over an existing executor and cache
    pub fn with_executor(
        settings: &BackupifySettings,
        base_url: impl Into<String>,
        executor: Arc<RequestExecutor>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            app_type: settings.app_type.clone(),
            converter: UnitConverter::new(UnitBase::select(settings.binary_units)),
            cache_ttl: settings.provider.cache_ttl(),
            pager: PaginationDriver::new(executor, cache, settings.provider.page_size),
        }
    }

    /// URL for `endpoint` under the client's base URL
    pub fn build_url(&self, endpoint: &str, ids: &[&str]) -> Result<String> {
        build_url(&self.base_url, endpoint, ids)
    }

    /// The response cache
    pub fn cache(&self) -> &ResponseCache {
        self.pager.cache()
    }

    /// User operations
    pub fn users(&self) -> UserClient<'_> {
        UserClient { client: self }
    }
}

/// User operations, borrowed from a [`BackupifyClient`]
#[derive(Debug, Clone, Copy)]
pub struct UserClient<'a> {
    client: &'a BackupifyClient,
}

impl UserClient<'_> {
    /// Every user, with sizes converted to bytes. Cached for the
    /// configured TTL.
    pub async fn all(&self) -> Result<Users> {
        let client = self.client;
        let url = client.build_url(USERS_ENDPOINT, &[])?;
        let key = format!("{} {}", cache_key(Method::POST, &url)?, client.app_type);
        info!(app_type = %client.app_type, "Getting all users from Backupify");

        let request = PageRequest::for_columns(&USER_COLUMNS)
            .order_by(1, SortDirection::Asc)
            .with_field("appType", client.app_type.clone());
        let converter = client.converter;

        client
            .pager
            .fetch_all_then(&key, &url, request, client.cache_ttl, |mut users: Users| async move {
                let summary = converter.convert(&mut users.data).await;
                info!(
                    converted = summary.converted,
                    failed = summary.failed,
                    "Converted user sizes"
                );
                users
            })
            .await
    }

    /// Users whose converted size is strictly above `bytes`
    pub fn larger_than(&self, users: &Users, bytes: f64) -> Users {
        let data: Vec<User> = users
            .data
            .iter()
            .filter(|user| user.used_bytes_float.is_some_and(|size| size > bytes))
            .inspect(|user| info!(user = %user.name, used = %user.used_bytes, "User above size threshold"))
            .cloned()
            .collect();

        let count = data.len() as u64;
        PageResponse {
            draw: users.draw.clone(),
            records_total: count,
            records_filtered: count,
            data,
        }
    }
}
