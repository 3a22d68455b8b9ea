//! Provider clients built on the shared access layer
//!
//! Each client owns one executor (and so one rate limiter) and one response
//! cache. Sub-clients such as `users()` borrow the parent for chained calls:
//!
//! ```rust,ignore
//! let users = backupify.users().all().await?;
//! let heavy = backupify.users().larger_than(&users, 50e9);
//! ```

pub mod backupify;
pub mod google;
pub mod okta;

pub use backupify::BackupifyClient;
pub use google::GoogleClient;
pub use okta::OktaClient;

use crate::auth::Credentialer;
use crate::cache::{cache_key, ResponseCache};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::http::{RateLimiter, RateLimiterConfig, ReqwestTransport, RequestExecutor};
use crate::types::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Join `endpoint` and percent-encoded `ids` onto `base`
pub fn build_url(base: &str, endpoint: &str, ids: &[&str]) -> Result<String> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_matches('/')
    );
    let mut url = Url::parse(&joined)?;
    if !ids.is_empty() {
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("'{base}' cannot carry path segments")))?
            .extend(ids);
    }
    Ok(url.into())
}

/// Executor over the production transport with the provider's quota
pub(crate) fn build_executor(
    config: &ProviderConfig,
    credentials: Arc<dyn Credentialer>,
    default_quota: &RateLimiterConfig,
) -> Result<Arc<RequestExecutor>> {
    config.validate()?;
    let transport = ReqwestTransport::new(&config.transport_config())?;
    let limiter = RateLimiter::new(&config.rate_limiter_config(default_quota));

    Ok(Arc::new(
        RequestExecutor::new(Arc::new(transport), credentials, limiter)
            .with_acquire_timeout(config.acquire_timeout()),
    ))
}

/// Single GET served through the cache
pub(crate) async fn get_cached<T>(
    executor: &RequestExecutor,
    cache: &ResponseCache,
    url: &str,
    ttl: Duration,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let key = cache_key(Method::GET, url)?;
    if let Some(hit) = cache.get::<T>(&key).await {
        debug!(url, "Serving response from cache");
        return Ok(hit);
    }

    let value: T = executor.execute(Method::GET, url, None::<&()>).await?;
    cache.set(&key, &value, ttl).await?;
    Ok(value)
}
