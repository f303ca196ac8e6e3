use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::modules::auth::interface::{AuthError, SessionStore, UserStore};
use crate::modules::auth::middleware::{append_pair_cookies, clear_pair_cookies, AuthUser};
use crate::modules::auth::model::{Session, TwoFactorStatus, User, UserStatus};
use crate::modules::auth::schema::{
    LoginRequest, LoginResponse, LogoutResponse, RateLimitStatusResponse, RecoveryCodeRequest,
    RegisterRequest, RegisterResponse, TokenPairResponse, TwoFactorSetupResponse,
    TwoFactorVerifyRequest, TwoFactorVerifyResponse, UserResponse,
};
use crate::services::cookies::{self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::services::hashing;
use crate::services::token::TokenPair;
use crate::AppState;

/// Client address for rate limiting: first X-Forwarded-For hop, then
/// X-Real-IP. The service is expected to sit behind a trusted proxy.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn pair_response(state: &AppState, pair: &TokenPair) -> TokenPairResponse {
    TokenPairResponse {
        access_token: pair.access_token.clone(),
        refresh_token: pair.refresh_token.clone(),
        token_type: "Bearer",
        expires_in: state.tokens.access_token_ttl_secs(),
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    if req.password != req.password_confirm {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }

    if state.store.email_exists(&req.email).await? {
        return Err(AuthError::EmailAlreadyExists);
    }

    let password_hash = hashing::hash_password(&req.password)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email.clone(),
        password_hash,
        status: UserStatus::Active,
        role: "USER".to_string(),
        two_factor_status: TwoFactorStatus::Disabled,
        two_factor_secret: None,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };

    state.store.create_user(&user).await?;

    let pair = state.tokens.issue_pair(&user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(&user),
            tokens: pair_response(&state, &pair),
        }),
    ))
}

/// Records the failure for the limiter and hands back the uniform
/// credential error. Missing user, blocked user and wrong password all
/// leave through here.
async fn failed_login(state: &AppState, ip: &str, ua: Option<&str>) -> AuthError {
    if let Err(err) = state.limiter.record_failure(ip, ua).await {
        return err;
    }
    AuthError::InvalidCredentials
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let ip = client_ip(&headers);
    let ua = user_agent(&headers);

    // Admission check runs before any credential is touched.
    state.limiter.check_and_admit(&ip).await?;

    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        return Err(failed_login(&state, &ip, ua.as_deref()).await);
    };

    if user.status == UserStatus::Blocked {
        return Err(failed_login(&state, &ip, ua.as_deref()).await);
    }

    let password_ok = hashing::verify_password(&req.password, &user.password_hash)
        .map_err(|e| AuthError::Internal(format!("password verification failed: {e}")))?;
    if !password_ok {
        return Err(failed_login(&state, &ip, ua.as_deref()).await);
    }

    let pair = state.tokens.issue_pair(&user.id).await?;
    let claims = state.tokens.verify(&pair.access_token)?;

    let now = Utc::now();
    state
        .store
        .create_session(&Session {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user.id.clone()),
            ip_address: ip,
            user_agent: ua,
            token: claims.jti,
            created_at: now,
            expires_at: now + state.auth.refresh_token_ttl,
        })
        .await?;
    state.store.touch_last_login(&user.id, now).await?;

    let mut response = (
        StatusCode::OK,
        Json(LoginResponse {
            user: UserResponse::from(&user),
            tokens: pair_response(&state, &pair),
        }),
    )
        .into_response();
    append_pair_cookies(response.headers_mut(), &pair, &state);

    Ok(response)
}

/// Revokes whatever the caller presented and clears both cookies.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    if let Some(access_token) = cookies::read_cookie(&headers, ACCESS_TOKEN_COOKIE) {
        state.tokens.revoke(&access_token).await?;
    }

    if let Some(refresh_token) = cookies::read_cookie(&headers, REFRESH_TOKEN_COOKIE) {
        state.tokens.revoke(&refresh_token).await?;
    }

    let mut response = (
        StatusCode::OK,
        Json(LogoutResponse {
            message: "Logged out",
        }),
    )
        .into_response();
    clear_pair_cookies(response.headers_mut(), &state);

    Ok(response)
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

pub async fn two_factor_setup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TwoFactorSetupResponse>, AuthError> {
    let setup = state.two_factor.setup_secret(&user.id).await?;

    Ok(Json(TwoFactorSetupResponse {
        qr_code: setup.qr_code,
        secret: setup.secret,
    }))
}

pub async fn two_factor_verify(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<TwoFactorVerifyRequest>,
) -> Result<Json<TwoFactorVerifyResponse>, AuthError> {
    let recovery_codes = state.two_factor.verify_code(&user.id, &req.token).await?;

    Ok(Json(TwoFactorVerifyResponse {
        success: true,
        recovery_codes,
    }))
}

pub async fn two_factor_recovery(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RecoveryCodeRequest>,
) -> Result<Json<TwoFactorVerifyResponse>, AuthError> {
    state.two_factor.redeem_recovery_code(&user.id, &req.code).await?;

    Ok(Json(TwoFactorVerifyResponse {
        success: true,
        recovery_codes: Vec::new(),
    }))
}

pub async fn rate_limit_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RateLimitStatusResponse>, AuthError> {
    let stats = state.limiter.stats(&client_ip(&headers)).await?;

    Ok(Json(RateLimitStatusResponse {
        success: true,
        data: stats,
    }))
}
