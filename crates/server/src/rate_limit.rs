//! Fixed-window request limiter keyed by client IP.
//!
//! Counters live in process memory only. Every response passing through the
//! limiter carries `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset` (epoch milliseconds); a request past the limit gets a
//! 429 JSON body instead of reaching the handler.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use zam_core::config::RateLimitConfig;

const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Clone, Copy, Debug)]
struct ClientWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

pub struct RateLimiter {
    limit: u32,
    window: TimeDelta,
    clients: Mutex<HashMap<String, ClientWindow>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LimitExceeded {
    error: &'static str,
    message: String,
    reset_time: String,
}

impl RateLimiter {
    pub fn new(limit: u32, window: TimeDelta) -> Self {
        Self { limit, window, clients: Mutex::new(HashMap::new()) }
    }

    /// `None` when limiting is switched off.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let window_secs = i64::try_from(config.window_secs).unwrap_or(i64::MAX);
        let window = TimeDelta::try_seconds(window_secs).unwrap_or(TimeDelta::MAX);
        Some(Self::new(config.requests_per_window, window))
    }

    /// Counts one request for `client` and reports whether it may proceed.
    pub fn check(&self, client: &str, now: DateTime<Utc>) -> RateDecision {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = clients
            .entry(client.to_string())
            .or_insert(ClientWindow { count: 0, reset_at: self.window_end(now) });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = self.window_end(now);
        }
        entry.count = entry.count.saturating_add(1);

        RateDecision {
            allowed: entry.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        }
    }

    /// Drops clients whose window ended at least one full window ago.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let before = clients.len();
        clients.retain(|_, window| now < self.window_end(window.reset_at));
        before - clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn spawn_eviction(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = limiter.evict_expired(Utc::now());
                if evicted > 0 {
                    debug!(
                        event_name = "rate_limit.eviction.completed",
                        evicted,
                        remaining = limiter.tracked_clients(),
                        "expired rate limit windows evicted"
                    );
                }
            }
        })
    }

    fn window_end(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_signed(self.window).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn window_label(&self) -> String {
        match self.window.num_seconds() {
            86_400 => "day".to_string(),
            3_600 => "hour".to_string(),
            60 => "minute".to_string(),
            seconds => format!("{seconds} seconds"),
        }
    }
}

pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let decision = limiter.check(&client, Utc::now());

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        let reset_time = decision.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        warn!(
            event_name = "rate_limit.request.rejected",
            client = %client,
            limit = decision.limit,
            reset_time = %reset_time,
            "client exceeded request limit"
        );
        let body = LimitExceeded {
            error: "Too Many Requests",
            message: format!(
                "Rate limit exceeded: {} requests per {} allowed. Please try again after {reset_time}",
                decision.limit,
                limiter.window_label()
            ),
            reset_time,
        };
        (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at.timestamp_millis()));
}

/// Peer address when the server was started with connect info, otherwise
/// the first `X-Forwarded-For` hop.
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(address)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return address.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::post,
        Router,
    };
    use chrono::{TimeDelta, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use zam_core::config::RateLimitConfig;

    use super::{enforce, RateLimiter};

    fn limited_router(limiter: Arc<RateLimiter>) -> Router {
        Router::new()
            .route("/limited", post(|| async { "ok" }))
            .layer(from_fn_with_state(limiter, enforce))
    }

    fn request_from(ip: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/limited")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn fourth_request_in_window_is_rejected() {
        let limiter = RateLimiter::new(3, TimeDelta::days(1));
        let now = Utc::now();

        let decisions: Vec<_> = (0..4).map(|_| limiter.check("10.0.0.1", now)).collect();

        assert_eq!(decisions.iter().map(|d| d.remaining).collect::<Vec<_>>(), vec![2, 1, 0, 0]);
        assert!(decisions[2].allowed);
        assert!(!decisions[3].allowed);
        assert!(limiter.check("10.0.0.2", now).allowed);
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, TimeDelta::seconds(60));
        let now = Utc::now();

        assert!(limiter.check("client", now).allowed);
        assert!(!limiter.check("client", now + TimeDelta::seconds(30)).allowed);

        let renewed = limiter.check("client", now + TimeDelta::seconds(61));
        assert!(renewed.allowed);
        assert_eq!(renewed.reset_at, now + TimeDelta::seconds(121));
    }

    #[test]
    fn eviction_waits_one_full_window_past_reset() {
        let limiter = RateLimiter::new(3, TimeDelta::seconds(60));
        let now = Utc::now();
        limiter.check("old", now);
        limiter.check("fresh", now + TimeDelta::seconds(90));

        assert_eq!(limiter.evict_expired(now + TimeDelta::seconds(100)), 0);
        assert_eq!(limiter.evict_expired(now + TimeDelta::seconds(120)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn disabled_config_builds_no_limiter() {
        let config = RateLimitConfig { enabled: false, requests_per_window: 3, window_secs: 86_400 };
        assert!(RateLimiter::from_config(&config).is_none());
    }

    #[tokio::test]
    async fn middleware_sets_headers_and_rejects_over_limit() {
        let app = limited_router(Arc::new(RateLimiter::new(1, TimeDelta::days(1))));

        let first = app.clone().oneshot(request_from("203.0.113.9")).await.expect("first");
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-ratelimit-limit"], "1");
        assert_eq!(first.headers()["x-ratelimit-remaining"], "0");
        assert!(first.headers().contains_key("x-ratelimit-reset"));

        let second = app.clone().oneshot(request_from("203.0.113.9")).await.expect("second");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
        let body = to_bytes(second.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["error"], "Too Many Requests");
        assert!(payload["message"].as_str().unwrap_or_default().contains("1 requests per day"));
        assert!(payload["resetTime"].as_str().unwrap_or_default().ends_with('Z'));

        let other = app.oneshot(request_from("198.51.100.4")).await.expect("other client");
        assert_eq!(other.status(), StatusCode::OK);
    }
}
