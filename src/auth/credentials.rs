//! Credentialer implementations
//!
//! A credentialer hands the executor the auth headers for the next request.
//! It can drop a cached token (`refresh`) or switch the identity requests
//! are made as (`impersonate`); the executor never looks inside the token.

use super::types::{AuthConfig, CachedToken, ServiceAccountKey};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Supplies auth headers to the request executor
#[async_trait]
pub trait Credentialer: Send + Sync {
    /// Headers to attach to the next request
    async fn headers(&self) -> Result<HeaderMap>;

    /// Drop any cached token so the next call obtains a fresh one
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Act as `subject` from the next request on
    async fn impersonate(&self, subject: &str) -> Result<()> {
        Err(Error::ImpersonationUnsupported {
            subject: subject.to_string(),
        })
    }
}

// ============================================================================
// Static Credentials
// ============================================================================

/// Fixed header set (API keys, long-lived bearer tokens)
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    headers: HeaderMap,
}

impl StaticCredentials {
    /// Build from an auth config
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        match config {
            AuthConfig::None => {}
            AuthConfig::ApiKey {
                header_name,
                prefix,
                value,
            } => {
                let name = header_name.as_deref().unwrap_or("Authorization");
                let value = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                headers.insert(header_name_of(name)?, sensitive_value(&value)?);
            }
            AuthConfig::Bearer { token } => {
                headers.insert(AUTHORIZATION, sensitive_value(&format!("Bearer {token}"))?);
            }
            AuthConfig::CustomHeaders { headers: custom } => {
                for (key, value) in custom {
                    headers.insert(header_name_of(key)?, sensitive_value(value)?);
                }
            }
        }
        Ok(Self { headers })
    }

    /// No credentials at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Okta-style `Authorization: SSWS <token>`
    pub fn ssws(token: impl Into<String>) -> Result<Self> {
        Self::new(&AuthConfig::ApiKey {
            header_name: None,
            prefix: Some("SSWS ".to_string()),
            value: token.into(),
        })
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(token: impl Into<String>) -> Result<Self> {
        Self::new(&AuthConfig::Bearer {
            token: token.into(),
        })
    }
}

#[async_trait]
impl Credentialer for StaticCredentials {
    async fn headers(&self) -> Result<HeaderMap> {
        Ok(self.headers.clone())
    }
}

fn header_name_of(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::auth(format!("Invalid header name '{name}': {e}")))
}

fn sensitive_value(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| Error::auth(format!("Invalid header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

// ============================================================================
// Service Account Credentials
// ============================================================================

#[derive(Debug, Default)]
struct ServiceAccountState {
    subject: Option<String>,
    token: Option<CachedToken>,
}

/// Service-account JWT exchanged for short-lived access tokens
pub struct ServiceAccountCredentials {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    token_lifetime_seconds: i64,
    state: RwLock<ServiceAccountState>,
    http_client: Client,
}

impl ServiceAccountCredentials {
    /// Create credentials for the given key and OAuth scopes
    pub fn new(key: ServiceAccountKey, scopes: Vec<String>) -> Self {
        Self::with_client(key, scopes, Client::new())
    }

    /// Create credentials using a custom HTTP client for token requests
    pub fn with_client(key: ServiceAccountKey, scopes: Vec<String>, http_client: Client) -> Self {
        Self {
            key,
            scopes,
            token_lifetime_seconds: 3600,
            state: RwLock::new(ServiceAccountState::default()),
            http_client,
        }
    }

    /// Start out impersonating `subject`
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.state.get_mut().subject = Some(subject.into());
        self
    }

    /// The identity currently impersonated, if any
    pub async fn subject(&self) -> Option<String> {
        self.state.read().await.subject.clone()
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<String> {
        {
            let state = self.state.read().await;
            if let Some(token) = state.token.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut state = self.state.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = state.token.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_token(state.subject.as_deref()).await?;
        let token_str = new_token.token.clone();
        state.token = Some(new_token);
        Ok(token_str)
    }

    /// Sign an assertion and exchange it at the token endpoint
    async fn fetch_token(&self, subject: Option<&str>) -> Result<CachedToken> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: self.key.client_email.clone(),
            sub: subject.map(String::from),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + self.token_lifetime_seconds,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);

        let encoding_key =
            EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(|e| {
                Error::JwtGeneration {
                    message: format!("Invalid private key: {e}"),
                }
            })?;
        let jwt = encode(&header, &claims, &encoding_key).map_err(|e| Error::JwtGeneration {
            message: format!("Failed to encode JWT: {e}"),
        })?;

        debug!(issuer = %self.key.client_email, subject, "Exchanging service account JWT");
        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];
        let response = self
            .http_client
            .post(&self.key.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!("JWT token exchange failed with status {status}: {body}"),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        Ok(token_response.into_cached_token())
    }
}

#[async_trait]
impl Credentialer for ServiceAccountCredentials {
    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.get_or_refresh_token().await?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, sensitive_value(&format!("Bearer {token}"))?);
        Ok(headers)
    }

    async fn refresh(&self) -> Result<()> {
        self.state.write().await.token = None;
        Ok(())
    }

    async fn impersonate(&self, subject: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.subject = Some(subject.to_string());
        state.token = None;
        info!(subject, "Switched service account identity");
        Ok(())
    }
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("key", &self.key)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}

/// JWT claims for the service account assertion
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}
