//! Fixed-window throttling counters shared between server instances.
//!
//! `INCR` is not idempotent, so every check is a single attempt: on error or
//! timeout the caller falls back to its local buckets instead of retrying.

use crate::config::RateLimitConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Default)]
struct Counters {
    checks: AtomicU64,
    rejected: AtomicU64,
    fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub(crate) struct RedisLimitStats {
    pub checks_total: u64,
    pub rejected_total: u64,
    pub fallbacks_total: u64,
}

#[derive(Clone)]
pub(crate) struct RedisBackend {
    client: redis::Client,
    prefix: String,
    timeout: Duration,
    counters: Arc<Counters>,
}

/// Window length that lets `capacity` requests through in the time a
/// local bucket needs to refill from empty.
fn window_secs(cfg: &RateLimitConfig) -> u64 {
    (cfg.capacity / cfg.refill_per_sec.max(0.001)).ceil().max(1.0) as u64
}

fn window_key(prefix: &str, scope: &str, client: &str, now_secs: u64, window: u64) -> String {
    format!("{prefix}:rl:{scope}:{client}:{}", now_secs / window)
}

impl RedisBackend {
    pub(crate) fn new(url: &str, prefix: &str, timeout: Duration) -> Result<Self, String> {
        let client = redis::Client::open(url).map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
            timeout,
            counters: Arc::new(Counters::default()),
        })
    }

    pub(crate) fn stats(&self) -> RedisLimitStats {
        RedisLimitStats {
            checks_total: self.counters.checks.load(Ordering::Relaxed),
            rejected_total: self.counters.rejected.load(Ordering::Relaxed),
            fallbacks_total: self.counters.fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Count one request for `client` and report whether it fits the window.
    pub(crate) async fn rate_limit_allow(
        &self,
        scope: &str,
        client: &str,
        cfg: &RateLimitConfig,
    ) -> Result<bool, String> {
        let window = window_secs(cfg);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_secs();
        let key = window_key(&self.prefix, scope, client, now, window);
        let limit = cfg.capacity.floor().max(1.0) as i64;

        let count = match tokio::time::timeout(self.timeout, self.increment(&key, window)).await {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => return Err(self.fallback(e)),
            Err(_) => return Err(self.fallback("redis timeout".to_string())),
        };
        self.counters.checks.fetch_add(1, Ordering::Relaxed);
        let allowed = count <= limit;
        if !allowed {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        }
        Ok(allowed)
    }

    /// `INCR` and `EXPIRE` in one MULTI block, so a counter never outlives
    /// its window even if the connection drops between the two.
    async fn increment(&self, key: &str, window: u64) -> Result<i64, String> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        let (count, _): (i64, bool) = redis::pipe()
            .atomic()
            .incr(key, 1_i64)
            .expire(key, (window + 1) as i64)
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())?;
        Ok(count)
    }

    fn fallback(&self, error: String) -> String {
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        error
    }
}
