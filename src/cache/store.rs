//! In-memory TTL store

use crate::error::Result;
use crate::http::deadline_after;
use crate::types::Method;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Bytes,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Canonical request identity: upper-case method plus normalized URL
pub fn cache_key(method: Method, url: &str) -> Result<String> {
    let url = Url::parse(url)?;
    Ok(format!("{method} {url}"))
}

/// Shared TTL cache, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ResponseCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live entry and decode it.
    ///
    /// Expired entries and entries that no longer decode as `T` are misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached entry does not match requested type");
                None
            }
        }
    }

    /// Look up a live entry without decoding it
    pub async fn get_raw(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                debug!(key, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!(key, "Cache entry expired");
                None
            }
            None => {
                debug!(key, "Cache miss");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let encoded = serde_json::to_vec(value)?;
        self.set_raw(key, Bytes::from(encoded), ttl).await;
        Ok(())
    }

    /// Store raw bytes under `key` for `ttl`
    pub async fn set_raw(&self, key: &str, value: Bytes, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: deadline_after(Instant::now(), ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        debug!(key, ttl_secs = ttl.as_secs(), "Cached response");
    }

    /// Whether a live entry exists for `key`
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .is_some_and(|entry| entry.is_live(Instant::now()))
    }
}
