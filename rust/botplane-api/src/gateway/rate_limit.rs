//! Rate limiting middleware using governor.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use parking_lot::Mutex;
use serde::Serialize;

use crate::AppState;

/// Rate limiter type alias.
pub type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Key taken from this header; absent callers share one bucket.
const KEY_HEADER: &str = "x-org-id";

/// Per-key rate limiters over a simple in-memory map.
pub struct KeyedRateLimiters {
    limiters: Mutex<HashMap<String, Arc<DirectRateLimiter>>>,
    quota: Quota,
}

impl std::fmt::Debug for KeyedRateLimiters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRateLimiters")
            .field("keys", &self.limiters.lock().len())
            .finish()
    }
}

impl KeyedRateLimiters {
    /// Create a limiter collection with the given quota.
    ///
    /// Zero values are clamped to one; configuration validation rejects
    /// them before this point.
    #[must_use]
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            limiters: Mutex::new(HashMap::new()),
            quota,
        }
    }

    /// Get or create the limiter for a key.
    pub fn get_or_create(&self, key: &str) -> Arc<DirectRateLimiter> {
        let mut limiters = self.limiters.lock();
        if let Some(limiter) = limiters.get(key) {
            return Arc::clone(limiter);
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        limiters.insert(key.to_string(), Arc::clone(&limiter));
        limiter
    }
}

/// Rate limit error response.
#[derive(Debug, Clone, Serialize)]
struct RateLimitResponse {
    error: &'static str,
    message: &'static str,
}

/// Middleware rejecting requests over the per-key quota.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("global")
        .to_string();

    let limiter = state.limiters.get_or_create(&key);
    if limiter.check().is_err() {
        tracing::warn!(%key, "request rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitResponse {
                error: "rate_limited",
                message: "Too many requests; retry shortly",
            }),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_enforced_per_key() {
        let limiters = KeyedRateLimiters::new(60, 2);
        let limiter = limiters.get_or_create("org_1");
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());

        // A different key gets its own bucket.
        let other = limiters.get_or_create("org_2");
        assert!(other.check().is_ok());
    }
}
