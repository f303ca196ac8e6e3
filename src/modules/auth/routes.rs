use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{controller, middleware::authenticate};
use crate::AppState;

pub fn auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/me", get(controller::me))
        .route("/2fa/setup", post(controller::two_factor_setup))
        .route("/2fa/verify", post(controller::two_factor_verify))
        .route("/2fa/recovery", post(controller::two_factor_recovery))
        .layer(middleware::from_fn_with_state(state, authenticate));

    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/logout", post(controller::logout))
        .merge(protected)
}

pub fn rate_limit_routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(controller::rate_limit_status))
}
