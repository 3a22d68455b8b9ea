//! Exhaustive pagination driver

use super::types::{PageRequest, PageResponse, PageWindow};
use crate::cache::ResponseCache;
use crate::error::Result;
use crate::http::RequestExecutor;
use crate::types::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches complete record sets, page by page, through the cache
#[derive(Debug, Clone)]
pub struct PaginationDriver {
    executor: Arc<RequestExecutor>,
    cache: ResponseCache,
    page_size: u64,
    method: Method,
}

impl PaginationDriver {
    /// Create a driver requesting `page_size` records per page
    pub fn new(executor: Arc<RequestExecutor>, cache: ResponseCache, page_size: u64) -> Self {
        Self {
            executor,
            cache,
            page_size: page_size.max(1),
            method: Method::POST,
        }
    }

    /// Use `method` for page requests (POST by default)
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// The executor pages are fetched through
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// The cache complete aggregates are stored in
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Records requested per page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Fetch every record behind `url`, serving from the cache when possible.
    ///
    /// The run starts at `request.start` and pages by `request.length`, or by
    /// the driver's page size when that is zero.
    pub async fn fetch_all<T>(
        &self,
        cache_key: &str,
        url: &str,
        request: PageRequest,
        ttl: Duration,
    ) -> Result<PageResponse<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.fetch_all_then(cache_key, url, request, ttl, std::future::ready)
            .await
    }

    /// Like `fetch_all`, running `finish` over the complete aggregate
    /// before it is cached. Cache hits skip `finish`.
    pub async fn fetch_all_then<T, F, Fut>(
        &self,
        cache_key: &str,
        url: &str,
        mut request: PageRequest,
        ttl: Duration,
        finish: F,
    ) -> Result<PageResponse<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(PageResponse<T>) -> Fut,
        Fut: Future<Output = PageResponse<T>>,
    {
        if let Some(cached) = self.cache.get::<PageResponse<T>>(cache_key).await {
            info!(key = cache_key, records = cached.len(), "Serving aggregate from cache");
            return Ok(cached);
        }

        let aggregate = self.collect_pages(url, &mut request).await?;
        let aggregate = finish(aggregate).await;

        // Only complete aggregates reach this point.
        self.cache.set(cache_key, &aggregate, ttl).await?;
        Ok(aggregate)
    }

    async fn collect_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        request: &mut PageRequest,
    ) -> Result<PageResponse<T>> {
        let length = match request.length {
            0 => self.page_size,
            length => length,
        };
        let mut window = PageWindow::starting_at(request.start, length);
        let mut aggregate = PageResponse::empty();
        let mut pages = 0u32;

        loop {
            request.start = window.start;
            request.length = window.length;

            let page: PageResponse<T> = self
                .executor
                .execute(self.method, url, Some(&*request))
                .await?;
            pages += 1;

            debug!(
                url,
                start = window.start,
                length = window.length,
                total = page.records_total,
                received = page.data.len(),
                "Fetched page"
            );

            aggregate.data.extend(page.data);
            aggregate.draw = page.draw;
            aggregate.records_total = page.records_total;
            aggregate.records_filtered = page.records_filtered;

            if !window.advance(page.records_total) {
                break;
            }
        }

        info!(
            url,
            pages,
            records = aggregate.data.len(),
            total = aggregate.records_total,
            "Pagination complete"
        );
        Ok(aggregate)
    }
}
