use crate::config::RateLimitConfig;
use crate::telemetry::redis_backend::RedisBackend;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;

/// Upper bound on locally tracked keys per limiter.
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, cfg: &RateLimitConfig) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
    }
}

/// Token bucket per key; Redis first when configured, local buckets otherwise.
pub(crate) struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    redis: Option<RedisBackend>,
    scope: String,
    max_keys: usize,
}

impl RateLimiter {
    pub(crate) fn new(redis: Option<RedisBackend>, scope: &str) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            redis,
            scope: scope.to_string(),
            max_keys: MAX_TRACKED_KEYS,
        }
    }

    pub(crate) fn redis(&self) -> Option<&RedisBackend> {
        self.redis.as_ref()
    }

    pub(crate) async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        if let Some(redis) = &self.redis {
            match redis.rate_limit_allow(&self.scope, key, cfg).await {
                Ok(v) => return v,
                Err(e) => {
                    tracing::warn!(scope = %self.scope, "redis rate-limit fallback: {e}");
                }
            }
        }
        let now = Instant::now();
        let mut lock = self.buckets.lock().await;
        if !lock.contains_key(key) && lock.len() >= self.max_keys {
            prune(&mut lock, now, cfg, self.max_keys);
            tracing::debug!(scope = %self.scope, tracked = lock.len(), "rate-limit buckets pruned");
        }
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        bucket.refill(now, cfg);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub(crate) async fn tracked_keys(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// Refilled-to-capacity buckets behave like fresh ones and go first. If the
/// map is still full, the least recently used bucket makes room.
fn prune(buckets: &mut HashMap<String, Bucket>, now: Instant, cfg: &RateLimitConfig, max_keys: usize) {
    buckets.retain(|_, b| {
        b.refill(now, cfg);
        b.tokens < cfg.capacity
    });
    while buckets.len() >= max_keys {
        let oldest = buckets
            .iter()
            .min_by_key(|(_, b)| b.last_refill)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(k) => {
                buckets.remove(&k);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow(capacity: f64) -> RateLimitConfig {
        RateLimitConfig {
            capacity,
            refill_per_sec: 0.0001,
        }
    }

    #[tokio::test]
    async fn bucket_drains_then_rejects_per_key() {
        let limiter = RateLimiter::new(None, "contact");
        let cfg = slow(2.0);
        assert!(limiter.allow("10.0.0.1", &cfg).await);
        assert!(limiter.allow("10.0.0.1", &cfg).await);
        assert!(!limiter.allow("10.0.0.1", &cfg).await);
        assert!(limiter.allow("10.0.0.2", &cfg).await);
        assert_eq!(limiter.tracked_keys().await, 2);
    }

    #[tokio::test]
    async fn tracked_keys_stay_bounded_under_key_churn() {
        let mut limiter = RateLimiter::new(None, "contact");
        limiter.max_keys = 8;
        let cfg = slow(1.0);
        for i in 0..100 {
            assert!(limiter.allow(&format!("198.51.100.{i}"), &cfg).await);
        }
        assert!(limiter.tracked_keys().await <= 8);
    }

    #[tokio::test]
    async fn pruning_prefers_full_buckets() {
        let mut limiter = RateLimiter::new(None, "login");
        limiter.max_keys = 2;
        let drained = slow(1.0);
        assert!(limiter.allow("abuser", &drained).await);
        // Two tokens left, so it counts as full against capacity 1.
        let roomy = slow(3.0);
        assert!(limiter.allow("visitor", &roomy).await);
        assert!(limiter.allow("newcomer", &drained).await);
        assert!(!limiter.allow("abuser", &drained).await);
    }
}
