//! Request quota limiting
//!
//! A fixed-window token budget shared by every request path of a client.
//! In reset-aware mode the budget is realigned to the quota headers the
//! provider returns, so windows that are not periodic from our side of the
//! wire are still honored.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per window
    pub capacity: u32,
    /// Length of the refill window
    pub window: Duration,
    /// Trust provider quota headers over local timing
    pub reset_aware: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 600,
            window: Duration::from_secs(60),
            reset_aware: false,
        }
    }
}

impl RateLimiterConfig {
    /// Create a fixed-budget config
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            reset_aware: false,
        }
    }

    /// Budget of `capacity` requests per minute
    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    /// Budget of `capacity` requests per day
    pub fn per_day(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(24 * 60 * 60))
    }

    /// Budget that follows provider-reported resets
    pub fn reset_aware(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            reset_aware: true,
        }
    }
}

/// Quota state as reported by a provider in response headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaSignal {
    /// Requests allowed in the provider's window
    pub limit: Option<u32>,
    /// Requests left in the provider's window
    pub remaining: Option<u32>,
    /// When the provider's window resets
    pub reset_at: Option<DateTime<Utc>>,
}

impl QuotaSignal {
    /// Parse `X-Rate-Limit-*` (Okta) or `x-ratelimit-*` headers.
    ///
    /// Returns `None` when the response carries no quota information.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let signal = Self {
            limit: header_number(headers, &["x-rate-limit-limit", "x-ratelimit-limit"]),
            remaining: header_number(
                headers,
                &["x-rate-limit-remaining", "x-ratelimit-remaining"],
            ),
            reset_at: header_number::<i64>(headers, &["x-rate-limit-reset", "x-ratelimit-reset"])
                .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single()),
        };

        if signal.is_empty() {
            None
        } else {
            Some(signal)
        }
    }

    /// True when no field was reported
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset_at.is_none()
    }
}

fn header_number<T: FromStr>(headers: &HeaderMap, names: &[&str]) -> Option<T> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
    })
}

#[derive(Debug)]
struct QuotaState {
    remaining: u32,
    /// Provider-reported limit in reset-aware mode, else the configured one
    capacity: u32,
    window_started: Instant,
    provider_reset: Option<Instant>,
}

impl QuotaState {
    fn refill(&mut self, config: &RateLimiterConfig, now: Instant) {
        if config.reset_aware {
            if let Some(reset) = self.provider_reset {
                // Provider owns the clock until its reset passes.
                if now >= reset {
                    self.remaining = self.capacity;
                    self.window_started = now;
                    self.provider_reset = None;
                }
                return;
            }
        }

        if now.duration_since(self.window_started) >= config.window {
            self.remaining = self.capacity;
            self.window_started = now;
        }
    }

    fn next_refill(&self, config: &RateLimiterConfig) -> Instant {
        match self.provider_reset {
            Some(reset) if config.reset_aware => reset,
            _ => deadline_after(self.window_started, config.window),
        }
    }
}

/// `start + wait`, saturating at a far-future instant
pub(crate) fn deadline_after(start: Instant, wait: Duration) -> Instant {
    start
        .checked_add(wait)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Stand-in for waits too long to represent as an instant
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Token budget limiter shared across concurrent callers
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimiterConfig>,
    state: Arc<Mutex<QuotaState>>,
    notify: Arc<Notify>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let config = RateLimiterConfig {
            capacity: config.capacity.max(1),
            ..config.clone()
        };

        Self {
            state: Arc::new(Mutex::new(QuotaState {
                remaining: config.capacity,
                capacity: config.capacity,
                window_started: Instant::now(),
                provider_reset: None,
            })),
            config: Arc::new(config),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Wait until a request slot is available and reserve it.
    ///
    /// Never fails. Dropping the future before it resolves reserves nothing.
    pub async fn acquire(&self) {
        loop {
            // Registered before the lock is released so a concurrent
            // release() cannot slip between the check and the wait.
            let notified = self.notify.notified();
            tokio::pin!(notified);

            let wake_at = {
                let mut state = self.state.lock().await;
                state.refill(&self.config, Instant::now());
                if state.remaining > 0 {
                    state.remaining -= 1;
                    return;
                }
                state.next_refill(&self.config)
            };

            debug!(
                wait_ms = wake_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Request quota exhausted, waiting"
            );

            tokio::select! {
                () = tokio::time::sleep_until(wake_at) => {}
                () = &mut notified => {}
            }
        }
    }

    /// Acquire with an upper bound on the wait
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| Error::QuotaWaitTimeout {
                waited_ms: timeout.as_millis() as u64,
            })
    }

    /// Return an unused slot to the budget
    pub async fn release(&self) {
        {
            let mut state = self.state.lock().await;
            state.remaining = (state.remaining + 1).min(state.capacity);
        }
        self.notify.notify_waiters();
    }

    /// Apply a provider quota signal.
    ///
    /// Ignored unless the limiter is reset-aware.
    pub async fn observe(&self, signal: &QuotaSignal) {
        if !self.config.reset_aware {
            return;
        }

        let has_tokens = {
            let mut state = self.state.lock().await;
            if let Some(limit) = signal.limit {
                state.capacity = limit.max(1);
                state.remaining = state.remaining.min(state.capacity);
            }
            if let Some(remaining) = signal.remaining {
                state.remaining = remaining.min(state.capacity);
            }
            if let Some(reset_at) = signal.reset_at {
                let until_reset = (reset_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                state.provider_reset = Some(deadline_after(Instant::now(), until_reset));
            }
            debug!(
                remaining = state.remaining,
                capacity = state.capacity,
                reset_in_ms = state
                    .provider_reset
                    .map(|r| r.saturating_duration_since(Instant::now()).as_millis() as u64),
                "Applied provider quota signal"
            );
            state.remaining > 0
        };

        if has_tokens {
            self.notify.notify_waiters();
        }
    }

    /// Tokens currently available
    pub async fn remaining(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.refill(&self.config, Instant::now());
        state.remaining
    }

    /// Configured maximum tokens per window
    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// Tokens a fresh window starts with: the provider's reported limit once
    /// one has been observed in reset-aware mode, else [`Self::capacity`]
    pub async fn effective_capacity(&self) -> u32 {
        self.state.lock().await.capacity
    }

    /// Whether provider signals are honored
    pub fn is_reset_aware(&self) -> bool {
        self.config.reset_aware
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.capacity, 600);
        assert_eq!(config.window, Duration::from_secs(60));
        assert!(!config.reset_aware);
    }

    #[test]
    fn test_rate_limiter_config_presets() {
        let minute = RateLimiterConfig::per_minute(12000);
        assert_eq!(minute.capacity, 12000);
        assert_eq!(minute.window, Duration::from_secs(60));

        let day = RateLimiterConfig::per_day(1000);
        assert_eq!(day.window, Duration::from_secs(86_400));

        let okta = RateLimiterConfig::reset_aware(600, Duration::from_secs(60));
        assert!(okta.reset_aware);
    }

    #[test]
    fn test_quota_signal_from_okta_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit-limit", HeaderValue::from_static("600"));
        headers.insert("x-rate-limit-remaining", HeaderValue::from_static("42"));
        headers.insert("x-rate-limit-reset", HeaderValue::from_static("1700000000"));

        let signal = QuotaSignal::from_headers(&headers).unwrap();
        assert_eq!(signal.limit, Some(600));
        assert_eq!(signal.remaining, Some(42));
        assert_eq!(signal.reset_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_quota_signal_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        assert!(QuotaSignal::from_headers(&headers).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_within_capacity() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(5));

        for expected in (0..5).rev() {
            limiter.acquire().await;
            assert_eq!(limiter.remaining().await, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_acquire_waits_for_release() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(5));
        for _ in 0..5 {
            limiter.acquire().await;
        }

        let mut waiter = tokio_test::task::spawn(limiter.acquire());
        assert_pending!(waiter.poll());

        limiter.release().await;
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
        assert_eq!(limiter.remaining().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(2, Duration::from_secs(1)));
        limiter.acquire().await;
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(limiter.remaining().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_timeout_when_exhausted() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(1));
        limiter.acquire().await;

        let result = limiter.acquire_timeout(Duration::from_secs(5)).await;
        assert!(matches!(
            result,
            Err(Error::QuotaWaitTimeout { waited_ms: 5000 })
        ));
        // The cancelled wait must not have taken anything.
        assert_eq!(limiter.remaining().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquire_never_overdraws() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(5));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(limiter.remaining().await, 0);

        let blocked = tokio::time::timeout(Duration::from_secs(30), limiter.acquire()).await;
        assert!(blocked.is_err());
        assert_eq!(limiter.remaining().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_capped_at_capacity() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(3));
        limiter.release().await;
        assert_eq!(limiter.remaining().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_aware_follows_provider_reset() {
        let limiter =
            RateLimiter::new(&RateLimiterConfig::reset_aware(10, Duration::from_secs(1)));
        limiter
            .observe(&QuotaSignal {
                limit: Some(10),
                remaining: Some(0),
                reset_at: Some(Utc::now() + chrono::Duration::seconds(30)),
            })
            .await;

        let start = Instant::now();
        limiter.acquire().await;
        // The local 1s window is ignored while the provider reset is pending.
        assert!(start.elapsed() >= Duration::from_secs(29));
        assert_eq!(limiter.remaining().await, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_aware_realigns_remaining() {
        let limiter =
            RateLimiter::new(&RateLimiterConfig::reset_aware(10, Duration::from_secs(60)));
        limiter
            .observe(&QuotaSignal {
                limit: None,
                remaining: Some(3),
                reset_at: None,
            })
            .await;
        assert_eq!(limiter.remaining().await, 3);

        // Never above capacity, whatever the provider claims.
        limiter
            .observe(&QuotaSignal {
                limit: None,
                remaining: Some(50),
                reset_at: None,
            })
            .await;
        assert_eq!(limiter.remaining().await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_refills_to_provider_limit() {
        let limiter =
            RateLimiter::new(&RateLimiterConfig::reset_aware(600, Duration::from_secs(60)));
        limiter
            .observe(&QuotaSignal {
                limit: Some(100),
                remaining: Some(0),
                reset_at: Some(Utc::now() + chrono::Duration::seconds(2)),
            })
            .await;
        assert_eq!(limiter.effective_capacity().await, 100);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(limiter.remaining().await, 100);

        // Released slots stop at the provider limit too.
        limiter.release().await;
        assert_eq!(limiter.remaining().await, 100);
        assert_eq!(limiter.capacity(), 600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_limit_clamps_remaining() {
        let limiter =
            RateLimiter::new(&RateLimiterConfig::reset_aware(600, Duration::from_secs(60)));
        limiter
            .observe(&QuotaSignal {
                limit: Some(0),
                remaining: None,
                reset_at: None,
            })
            .await;
        assert_eq!(limiter.effective_capacity().await, 1);
        assert_eq!(limiter.remaining().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_window_does_not_overflow() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, Duration::from_secs(u64::MAX)));
        limiter.acquire().await;

        let blocked = limiter.acquire_timeout(Duration::from_secs(5)).await;
        assert!(matches!(blocked, Err(Error::QuotaWaitTimeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_budget_ignores_signal() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(10));
        limiter
            .observe(&QuotaSignal {
                limit: Some(10),
                remaining: Some(0),
                reset_at: None,
            })
            .await;
        assert_eq!(limiter.remaining().await, 10);
        assert!(!limiter.is_reset_aware());
    }
}
