use std::{future::Future, num::NonZeroU32, pin::Pin, sync::Arc};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tower::{Layer, Service};
use uuid::Uuid;

use crate::modules::auth::interface::{AuthError, AuthStore, Result, SessionStore};
use crate::modules::auth::model::Session;

pub type BurstLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Process-wide admission limiter in front of every route. Allows `burst`
/// requests up front, then refills one per minute. Independent of the
/// store-backed login limiter below.
pub fn create_burst_limiter(burst: u32) -> BurstLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(1).unwrap())
        .allow_burst(NonZeroU32::new(burst).unwrap());
    Arc::new(RateLimiter::direct(quota))
}

#[derive(Clone)]
pub struct BurstLimitLayer {
    limiter: BurstLimiter,
}

impl BurstLimitLayer {
    pub fn new(limiter: BurstLimiter) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for BurstLimitLayer {
    type Service = BurstLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BurstLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BurstLimitService<S> {
    inner: S,
    limiter: BurstLimiter,
}

impl<S> Service<Request<Body>> for BurstLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if limiter.check().is_err() {
                return Ok(StatusCode::TOO_MANY_REQUESTS.into_response());
            }
            inner.call(request).await
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AttemptStats {
    pub attempts: i64,
    pub window_start: DateTime<Utc>,
    pub limited: bool,
}

/// Sliding-window limiter for the login endpoint. Failed attempts are
/// counted from the session table rather than an in-memory counter, so the
/// tally survives restarts and is shared by every instance on the store.
#[derive(Clone)]
pub struct LoginRateLimiter {
    store: Arc<dyn AuthStore>,
    window: Duration,
    max_failures: i64,
}

impl LoginRateLimiter {
    pub fn new(store: Arc<dyn AuthStore>, window: Duration, max_failures: i64) -> Self {
        Self {
            store,
            window,
            max_failures,
        }
    }

    pub async fn stats(&self, ip_address: &str) -> Result<AttemptStats> {
        let window_start = Utc::now() - self.window;
        let attempts = self
            .store
            .count_failed_attempts(ip_address, window_start)
            .await?;

        Ok(AttemptStats {
            attempts,
            window_start,
            limited: attempts >= self.max_failures,
        })
    }

    /// Admits or rejects before any credential is examined.
    pub async fn check_and_admit(&self, ip_address: &str) -> Result<()> {
        let stats = self.stats(ip_address).await?;
        if stats.limited {
            tracing::warn!(ip = %ip_address, attempts = stats.attempts, "login rate limit hit");
            return Err(AuthError::RateLimited {
                retry_after: Utc::now() + self.window,
            });
        }
        Ok(())
    }

    /// Records one failed attempt: a session row with the empty-token
    /// marker and no user. Called only after a 401 outcome.
    pub async fn record_failure(&self, ip_address: &str, user_agent: Option<&str>) -> Result<()> {
        let now = Utc::now();
        self.store
            .create_session(&Session {
                id: Uuid::new_v4().to_string(),
                user_id: None,
                ip_address: ip_address.to_string(),
                user_agent: user_agent.map(str::to_string),
                token: String::new(),
                created_at: now,
                expires_at: now + self.window,
            })
            .await
    }
}
