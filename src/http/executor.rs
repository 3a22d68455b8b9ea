//! Single-request executor
//!
//! Provides the one place where a request is charged against the quota,
//! sent, and decoded:
//! - Waits on the shared rate limiter before every call
//! - Applies default and credential headers
//! - Feeds provider quota headers back into the limiter
//! - Decodes JSON into the caller's type
//!
//! There are no retries here. A hidden retry would charge the budget twice
//! for one logical request; callers that want retries wrap `execute`.

use super::rate_limit::{QuotaSignal, RateLimiter};
use super::transport::{RawResponse, Transport};
use crate::auth::Credentialer;
use crate::error::{Error, Result};
use crate::types::Method;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// MIME type for JSON bodies
pub const JSON: &str = "application/json";

/// Issues rate-limited, credentialed requests and decodes the responses
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn Credentialer>,
    rate_limiter: RateLimiter,
    default_headers: HeaderMap,
    acquire_timeout: Option<Duration>,
}

impl RequestExecutor {
    /// Create an executor over a transport, credentials and a shared limiter
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn Credentialer>,
        rate_limiter: RateLimiter,
    ) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));

        Self {
            transport,
            credentials,
            rate_limiter,
            default_headers,
            acquire_timeout: None,
        }
    }

    /// Bound how long a request may wait for quota
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Add a header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// The shared rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// The active credentials
    pub fn credentials(&self) -> &Arc<dyn Credentialer> {
        &self.credentials
    }

    /// Send one request and decode the JSON response into `T`
    pub async fn execute<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(method, url, body).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| Error::decode(format!("{method} {url}: {e}")))
    }

    /// Send one request and return the untyped JSON response
    pub async fn execute_value<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Value>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(method, url, body).await
    }

    /// Send one request, returning the raw 2xx response
    pub async fn send<B>(&self, method: Method, url: &str, body: Option<&B>) -> Result<RawResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        // Everything that can fail locally happens before a token is spent.
        let body = body.map(serde_json::to_value).transpose()?;
        let mut headers = self.default_headers.clone();
        headers.extend(self.credentials.headers().await?);

        match self.acquire_timeout {
            Some(timeout) => self.rate_limiter.acquire_timeout(timeout).await?,
            None => self.rate_limiter.acquire().await,
        }

        debug!(%method, url, "Sending request");
        let response = self
            .transport
            .send(method, url, &headers, body.as_ref())
            .await?;

        if let Some(signal) = QuotaSignal::from_headers(&response.headers) {
            self.rate_limiter.observe(&signal).await;
        }

        if !response.is_success() {
            warn!(%method, url, status = response.status, "Request failed");
            return Err(Error::http_status(response.status, response.body_text()));
        }

        Ok(response)
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("rate_limiter", &self.rate_limiter)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}
