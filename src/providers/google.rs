//! Google Workspace user directory client
//!
//! Requests run as a service account, optionally impersonating a domain
//! user, or with a static API key. Lookups are not cached because their result depends on who is
//! being impersonated.

use super::{build_executor, build_url};
use crate::auth::{Credentialer, ServiceAccountCredentials, ServiceAccountKey, StaticCredentials};
use crate::config::GoogleSettings;
use crate::error::{Error, Result};
use crate::http::{RateLimiterConfig, RequestExecutor};
use crate::types::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Admin SDK root
pub const ADMIN_BASE_URL: &str = "https://admin.googleapis.com";

pub const USERS_ENDPOINT: &str = "admin/directory/v1/users";

/// Scope requested when none is configured
pub const DIRECTORY_USER_READONLY: &str =
    "https://www.googleapis.com/auth/admin.directory.user.readonly";

/// Configured scopes in first-seen order without repeats, or the read-only
/// directory scope when none are configured
pub fn dedupe_scopes(scopes: &[String]) -> Vec<String> {
    if scopes.is_empty() {
        return vec![DIRECTORY_USER_READONLY.to_string()];
    }
    let mut seen = HashSet::new();
    scopes
        .iter()
        .map(|scope| scope.trim())
        .filter(|scope| !scope.is_empty() && seen.insert(*scope))
        .map(String::from)
        .collect()
}

/// Default request budget
pub fn default_quota() -> RateLimiterConfig {
    RateLimiterConfig::per_minute(12000)
}

// ============================================================================
// Records
// ============================================================================

/// Directory user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub primary_email: String,
    #[serde(default)]
    pub name: Option<UserName>,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub org_unit_path: Option<String>,
}

/// Directory user name parts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the Google Workspace Admin SDK
#[derive(Debug, Clone)]
pub struct GoogleClient {
    base_url: String,
    executor: Arc<RequestExecutor>,
}

impl GoogleClient {
    /// Create a client over the given credentials
    pub fn new(settings: &GoogleSettings, credentials: Arc<dyn Credentialer>) -> Result<Self> {
        let base_url = settings
            .provider
            .base_url
            .clone()
            .unwrap_or_else(|| ADMIN_BASE_URL.to_string());
        let executor = build_executor(&settings.provider, credentials, &default_quota())?;
        Ok(Self { base_url, executor })
    }

    /// Create a client from the configured service account key, falling
    /// back to the API key when no service account is configured
    pub fn from_settings(settings: &GoogleSettings) -> Result<Self> {
        let key = match (&settings.service_account_file, &settings.service_account_base64) {
            (Some(path), _) => ServiceAccountKey::from_file(path)?,
            (None, Some(encoded)) => ServiceAccountKey::from_base64(encoded)?,
            (None, None) => return Self::with_api_key(settings),
        };

        let mut credentials = ServiceAccountCredentials::new(key, dedupe_scopes(&settings.scopes));
        if let Some(subject) = &settings.subject {
            credentials = credentials.with_subject(subject.clone());
        }
        Self::new(settings, Arc::new(credentials))
    }

    fn with_api_key(settings: &GoogleSettings) -> Result<Self> {
        match settings.api_key.as_deref().map(str::trim) {
            Some("") => Err(Error::missing_field("GOOGLE_API_KEY")),
            Some(key) => Self::new(settings, Arc::new(StaticCredentials::bearer(key)?)),
            None => Err(Error::missing_field("GOOGLE_SERVICE_ACCOUNT")),
        }
    }

    /// URL for `endpoint` followed by `ids` as path segments
    pub fn build_url(&self, endpoint: &str, ids: &[&str]) -> Result<String> {
        build_url(&self.base_url, endpoint, ids)
    }

    /// Make subsequent requests as `subject`
    pub async fn impersonate(&self, subject: &str) -> Result<()> {
        self.executor.credentials().impersonate(subject).await
    }

    /// User operations
    pub fn users(&self) -> UserClient<'_> {
        UserClient { client: self }
    }
}

/// User operations, borrowed from a [`GoogleClient`]
#[derive(Debug, Clone, Copy)]
pub struct UserClient<'a> {
    client: &'a GoogleClient,
}

impl UserClient<'_> {
    /// Look up one user by primary email, alias or id
    pub async fn get(&self, user_key: &str) -> Result<User> {
        let client = self.client;
        let url = client.build_url(USERS_ENDPOINT, &[user_key])?;
        client.executor.execute(Method::GET, &url, None::<&()>).await
    }
}
