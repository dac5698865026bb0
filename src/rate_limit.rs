use std::num::NonZeroU32;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::debug;

use crate::AppState;
use crate::config::ResilienceConfig;

/// Global token bucket shared by every browser request.
///
/// Not keyed by client: the server sits behind one page per user and the
/// bucket only protects the backend from bursts.
pub struct AppRateLimiter {
    limiter: DefaultDirectRateLimiter,
    enabled: bool,
}

impl std::fmt::Debug for AppRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRateLimiter")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl AppRateLimiter {
    /// A limiter allowing `requests_per_second` with bursts of `burst_size`.
    /// Zero values are raised to one.
    #[must_use]
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            enabled: true,
        }
    }

    #[must_use]
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            enabled: config.rate_limit_enabled,
            ..Self::new(config.requests_per_second, config.burst_size)
        }
    }

    /// Take one token. Always succeeds when limiting is disabled.
    pub fn check(&self) -> bool {
        !self.enabled || self.limiter.check().is_ok()
    }
}

/// `GET /chat/{sid}/turns/{turn}`. A long-poll waits on a backend call
/// that already passed the limiter, and a rejected poll strands the typing
/// bubble.
fn is_turn_poll(method: &Method, path: &str) -> bool {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    method == Method::GET && matches!(segments.as_slice(), ["chat", _, "turns", _])
}

/// Middleware to enforce rate limits
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !is_turn_poll(req.method(), req.uri().path()) && !state.rate_limiter.check() {
        debug!(name: "http.rate_limited", path = %req.uri().path(), "Request rate limited");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }
    Ok(next.run(req).await)
}
