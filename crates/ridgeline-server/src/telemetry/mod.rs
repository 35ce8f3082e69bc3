pub(crate) mod metrics;
pub(crate) mod rate_limiter;
pub(crate) mod redis_backend;
