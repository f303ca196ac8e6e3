pub mod config;
pub mod modules;
pub mod services;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::AuthConfig;
use modules::auth::interface::AuthStore;
use modules::auth::{auth_routes, rate_limit_routes};
use services::rate_limit::{create_burst_limiter, BurstLimitLayer, LoginRateLimiter};
use services::security::security_headers;
use services::token::TokenService;
use services::two_factor::TwoFactorService;

pub struct AppState {
    pub store: Arc<dyn AuthStore>,
    pub tokens: TokenService,
    pub two_factor: TwoFactorService,
    pub limiter: LoginRateLimiter,
    pub auth: AuthConfig,
}

pub async fn create_app(store: Arc<dyn AuthStore>, auth: AuthConfig) -> Router {
    let tokens = TokenService::new(store.clone(), auth.clone());
    let two_factor = TwoFactorService::new(store.clone(), auth.totp_issuer.clone());
    let limiter = LoginRateLimiter::new(
        store.clone(),
        auth.rate_limit_window,
        auth.rate_limit_max_failures,
    );

    // Burst of `burst_limit`, then 1 per minute
    let burst_limiter = create_burst_limiter(auth.burst_limit);

    let state = Arc::new(AppState {
        store,
        tokens,
        two_factor,
        limiter,
        auth,
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/rate-limit", rate_limit_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100)) // 100KB max body
        .layer(BurstLimitLayer::new(burst_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Auth Gate API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
