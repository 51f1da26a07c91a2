use crate::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{keyed::DashMapStateStore, InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter for global/unkeyed use
pub type UnkeyedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Rate limiter keyed by IP address
pub type IpRateLimiter = Arc<RateLimiter<SocketAddr, DashMapStateStore<SocketAddr>, DefaultClock>>;

/// Create an unkeyed rate limiter allowing `attempts` per `window_seconds`
pub fn create_unkeyed_rate_limiter(attempts: u32, window_seconds: u64) -> UnkeyedRateLimiter {
    let attempts = attempts.max(1);
    let period = Duration::from_millis((window_seconds * 1000) / attempts as u64);
    let quota = Quota::with_period(period)
        .expect("Failed to create quota with valid period")
        .allow_burst(NonZeroU32::new(attempts).expect("attempts is guaranteed to be non-zero"));

    Arc::new(RateLimiter::direct(quota))
}

/// Create a keyed rate limiter (by IP)
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let attempts = attempts.max(1);
    let period = Duration::from_millis((window_seconds * 1000) / attempts as u64);
    let quota = Quota::with_period(period)
        .expect("Failed to create quota with valid period")
        .allow_burst(NonZeroU32::new(attempts).expect("attempts is guaranteed to be non-zero"));

    Arc::new(RateLimiter::dashmap(quota))
}

/// Rate limiter keyed by a caller-supplied id, where each key carries its own
/// per-minute quota. Limiters are created lazily on first sight of a key.
#[derive(Default)]
pub struct KeyedRateLimiter {
    limiters: DashMap<String, UnkeyedRateLimiter>,
}

impl KeyedRateLimiter {
    pub fn new() -> Self {
        Self {
            limiters: DashMap::new(),
        }
    }

    /// Check `key` against its quota. A `per_minute` of 0 means unlimited.
    /// Returns the seconds to wait when over quota.
    pub fn check(&self, key: &str, per_minute: u32) -> Result<(), u64> {
        if per_minute == 0 {
            return Ok(());
        }

        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| create_unkeyed_rate_limiter(per_minute, 60))
            .clone();

        match limiter.check() {
            Ok(_) => Ok(()),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                Err(wait_time.as_secs())
            }
        }
    }
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<std::net::IpAddr>().ok());

    let addr = if let Some(ip) = forwarded_ip {
        Some(SocketAddr::new(ip, 0))
    } else {
        request
            .extensions()
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
            .map(|axum::extract::ConnectInfo(addr)| *addr)
    };

    match addr {
        Some(addr) => match limiter.check_key(&addr) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                Err(AppError::TooManyRequests(
                    "Too many requests from this IP. Please try again later.".to_string(),
                    Some(wait_time.as_secs()),
                ))
            }
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_limiter_blocks_after_quota() {
        let limiter = KeyedRateLimiter::new();

        for _ in 0..3 {
            assert!(limiter.check("tenant-a", 3).is_ok());
        }
        assert!(limiter.check("tenant-a", 3).is_err());
    }

    #[test]
    fn keyed_limiter_isolates_keys() {
        let limiter = KeyedRateLimiter::new();

        for _ in 0..3 {
            assert!(limiter.check("tenant-a", 3).is_ok());
        }
        assert!(limiter.check("tenant-a", 3).is_err());
        assert!(limiter.check("tenant-b", 3).is_ok());
    }

    #[test]
    fn zero_quota_means_unlimited() {
        let limiter = KeyedRateLimiter::new();

        for _ in 0..100 {
            assert!(limiter.check("tenant-a", 0).is_ok());
        }
    }
}
