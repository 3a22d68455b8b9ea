//! Okta user directory client

use super::{build_executor, build_url, get_cached};
use crate::auth::StaticCredentials;
use crate::cache::ResponseCache;
use crate::config::OktaSettings;
use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, RequestExecutor};
use crate::types::JsonObject;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Okta domain used when none is configured
pub const DEFAULT_DOMAIN: &str = "okta.com";

pub const USERS_ENDPOINT: &str = "users";
pub const GROUPS_ENDPOINT: &str = "groups";

/// Default request budget. Okta reports its own quota in response headers,
/// which the limiter follows once the first response arrives.
pub fn default_quota() -> RateLimiterConfig {
    RateLimiterConfig::reset_aware(600, Duration::from_secs(60))
}

/// `https://{org}.{domain}/api/v1`, tolerating a scheme or `.okta.com`
/// suffix on the org name and stray dots or slashes on the domain
pub fn base_url_for(org_name: &str, domain: &str) -> String {
    let org = org_name
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .trim_end_matches(".okta.com");
    let domain = domain.trim_matches(|c| c == '.' || c == '/');
    let domain = domain.strip_suffix(".com").unwrap_or(domain);
    format!("https://{org}.{domain}.com/api/v1")
}

// ============================================================================
// Records
// ============================================================================

/// Okta user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default, rename = "lastLogin")]
    pub last_login: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
}

/// Okta user profile; attributes beyond the standard ones land in `other`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub other: JsonObject,
}

/// Okta group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub profile: GroupProfile,
}

/// Okta group profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the Okta management API
#[derive(Debug, Clone)]
pub struct OktaClient {
    base_url: String,
    executor: Arc<RequestExecutor>,
    cache: ResponseCache,
    cache_ttl: Duration,
}

impl OktaClient {
    /// Create a client sending `Authorization: SSWS <token>`.
    ///
    /// A `base_url` with a scheme is used as the API root. Without one it is
    /// taken as the Okta domain and combined with `org_name`.
    pub fn new(settings: &OktaSettings, token: &str) -> Result<Self> {
        let base_url = match settings.provider.base_url.as_deref() {
            Some(url) if url.contains("://") => url.to_string(),
            _ if settings.org_name.is_empty() => {
                return Err(Error::missing_field("OKTA_ORG_NAME"));
            }
            // A bare base_url such as `oktapreview.com` names the domain
            bare => base_url_for(
                &settings.org_name,
                settings.domain.as_deref().or(bare).unwrap_or(DEFAULT_DOMAIN),
            ),
        };

        let credentials = Arc::new(StaticCredentials::ssws(token)?);
        let executor = build_executor(&settings.provider, credentials, &default_quota())?;
        info!(base_url = %base_url, "Created Okta client");

        Ok(Self {
            base_url,
            executor,
            cache: ResponseCache::new(),
            cache_ttl: settings.provider.cache_ttl(),
        })
    }

    /// Create a client with the configured API token
    pub fn from_settings(settings: &OktaSettings) -> Result<Self> {
        let token = settings
            .api_token
            .as_deref()
            .ok_or_else(|| Error::missing_field("OKTA_API_TOKEN"))?;
        Self::new(settings, token)
    }

    /// API root, e.g. `https://acme.okta.com/api/v1`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for `endpoint` followed by `ids` as path segments
    pub fn build_url(&self, endpoint: &str, ids: &[&str]) -> Result<String> {
        build_url(&self.base_url, endpoint, ids)
    }

    /// The executor shared by every request of this client
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// User operations
    pub fn users(&self) -> UserClient<'_> {
        UserClient { client: self }
    }

    /// Group operations
    pub fn groups(&self) -> GroupClient<'_> {
        GroupClient { client: self }
    }
}

/// User operations, borrowed from an [`OktaClient`]
#[derive(Debug, Clone, Copy)]
pub struct UserClient<'a> {
    client: &'a OktaClient,
}

impl UserClient<'_> {
    /// Look up one user by id or login
    pub async fn get(&self, id: &str) -> Result<User> {
        let client = self.client;
        let url = client.build_url(USERS_ENDPOINT, &[id])?;
        get_cached(&client.executor, &client.cache, &url, client.cache_ttl).await
    }

    /// Look up several users concurrently, in the order given. All lookups
    /// draw on the client's one budget; the first failure is returned.
    pub async fn get_many(&self, ids: &[&str]) -> Result<Vec<User>> {
        try_join_all(ids.iter().map(|id| self.get(id))).await
    }
}

/// Group operations, borrowed from an [`OktaClient`]
#[derive(Debug, Clone, Copy)]
pub struct GroupClient<'a> {
    client: &'a OktaClient,
}

impl GroupClient<'_> {
    /// Look up one group by id
    pub async fn get(&self, id: &str) -> Result<Group> {
        let client = self.client;
        let url = client.build_url(GROUPS_ENDPOINT, &[id])?;
        get_cached(&client.executor, &client.cache, &url, client.cache_ttl).await
    }
}
