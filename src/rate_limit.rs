//! # Request Rate Limiting
//!
//! Fixed-window counters keyed by client address (login and other
//! unauthenticated auth calls) or by user id (authenticated API calls).
//! Rejections surface as `429` problems carrying `Retry-After`.

use std::collections::HashMap;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::error::{ApiError, too_many_requests};
use crate::server::AppState;

/// Expired windows are swept once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed-window limiter; a limit of `0` lets everything through.
#[derive(Debug)]
pub struct RateLimiter<K> {
    max_requests: u32,
    window: Duration,
    entries: Mutex<HashMap<K, WindowEntry>>,
}

impl<K: Eq + Hash> RateLimiter<K> {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Counts one request for `key`.
    ///
    /// On rejection returns the whole seconds until the key's window resets (at least 1).
    pub async fn check(&self, key: K) -> Result<(), u64> {
        if self.max_requests == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if entries.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
        }

        let entry = entries.entry(key).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });
        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_requests {
            let remaining = self
                .window
                .saturating_sub(now.duration_since(entry.window_start));
            let seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(seconds.max(1));
        }

        entry.count += 1;
        Ok(())
    }
}

/// The limiters shared by every request of one server.
#[derive(Debug)]
pub struct RateLimits {
    pub login: RateLimiter<IpAddr>,
    pub anonymous: RateLimiter<IpAddr>,
    pub user: RateLimiter<Uuid>,
}

impl RateLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            login: RateLimiter::per_minute(config.rate_limit_login_per_minute),
            anonymous: RateLimiter::per_minute(config.rate_limit_anon_per_minute),
            user: RateLimiter::per_minute(config.rate_limit_user_per_minute),
        }
    }
}

/// Peer address of the connection, or `0.0.0.0` when the server was not
/// started with connect info (in-process routers).
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn rejected(scope: &'static str, retry_after: u64) -> ApiError {
    counter!("rate_limited_total", "scope" => scope).increment(1);
    tracing::info!(scope, retry_after, "Request rate limited");
    too_many_requests(retry_after)
}

/// Limits unauthenticated auth endpoints per client address.
pub async fn anonymous_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request);
    state
        .limits
        .anonymous
        .check(ip)
        .await
        .map_err(|retry_after| rejected("anonymous", retry_after))?;
    Ok(next.run(request).await)
}

/// Limits login attempts per client address, successful or not.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request);
    state
        .limits
        .login
        .check(ip)
        .await
        .map_err(|retry_after| rejected("login", retry_after))?;
    Ok(next.run(request).await)
}

/// Limits authenticated requests per user. Must run inside the auth middleware.
pub async fn user_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user_id) = request.extensions().get::<CurrentUser>().map(|user| user.id) {
        state
            .limits
            .user
            .check(user_id)
            .await
            .map_err(|retry_after| rejected("user", retry_after))?;
    }
    Ok(next.run(request).await)
}
