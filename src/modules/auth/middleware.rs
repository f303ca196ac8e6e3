use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::modules::auth::interface::{AuthError, UserStore};
use crate::modules::auth::model::{TwoFactorStatus, User, UserStatus};
use crate::modules::auth::schema::ErrorResponse;
use crate::services::cookies::{
    self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::services::token::{Claims, TokenPair, TokenService};
use crate::AppState;

/// Identity attached to the request once the gate admits it.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub role: String,
    pub two_factor_status: TwoFactorStatus,
    pub status: UserStatus,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role.clone(),
            two_factor_status: user.two_factor_status,
            status: user.status,
        }
    }
}

/// Outcome of the access-token verification step. Expiry is the one signal
/// the gate recovers from; everything else is terminal.
enum AccessCheck {
    Valid(Claims),
    Expired,
    Invalid,
}

fn check_access(tokens: &TokenService, token: &str) -> AccessCheck {
    match tokens.verify(token) {
        Ok(claims) => AccessCheck::Valid(claims),
        Err(AuthError::TokenExpired) => AccessCheck::Expired,
        Err(_) => AccessCheck::Invalid,
    }
}

/// Gate for every protected route.
///
/// Walks the per-request state machine: no token -> reject; blacklisted
/// jti -> reject; verify access; on expiry attempt exactly one rotation
/// with the refresh cookie; load the user and attach the identity. The
/// rejection body is identical for every token and identity failure.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let access_token = cookies::read_cookie(request.headers(), ACCESS_TOKEN_COOKIE);
    let refresh_token = cookies::read_cookie(request.headers(), REFRESH_TOKEN_COOKIE);

    // NoToken: nothing presented, nothing to clear.
    let Some(access_token) = access_token else {
        return reject(&state, false);
    };

    // CheckBlacklist, before any signature work.
    match state.tokens.is_blacklisted(&access_token).await {
        Ok(false) => {}
        Ok(true) => return reject(&state, true),
        Err(err) => return err.into_response(),
    }

    // VerifyAccess, with one rotation attempt on expiry.
    let mut rotated: Option<TokenPair> = None;
    let claims = match check_access(&state.tokens, &access_token) {
        AccessCheck::Valid(claims) => claims,
        AccessCheck::Expired => {
            let Some(refresh_token) = refresh_token else {
                return reject(&state, true);
            };
            match state.tokens.rotate(&refresh_token).await {
                Ok(pair) => match state.tokens.verify(&pair.access_token) {
                    Ok(claims) => {
                        tracing::debug!(user_id = %claims.user_id, "access token rotated in-flight");
                        rotated = Some(pair);
                        claims
                    }
                    Err(_) => return reject(&state, true),
                },
                Err(err @ AuthError::Database(_)) => return err.into_response(),
                Err(_) => return reject(&state, true),
            }
        }
        AccessCheck::Invalid => return reject(&state, true),
    };

    // LoadIdentity.
    let user = match state.store.find_user_by_id(&claims.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return reject(&state, true),
        Err(err) => return err.into_response(),
    };

    if user.status == UserStatus::Blocked {
        return reject(&state, true);
    }

    request.extensions_mut().insert(AuthUser::from(&user));

    let mut response = next.run(request).await;

    // Hand the rotated pair back to the caller.
    if let Some(pair) = rotated {
        append_pair_cookies(response.headers_mut(), &pair, &state);
    }

    response
}

/// Terminal rejection. When credentials were presented, they are cleared
/// so the client does not keep replaying a dead pair.
fn reject(state: &AppState, had_credentials: bool) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Not authenticated")),
    )
        .into_response();

    if had_credentials {
        clear_pair_cookies(response.headers_mut(), state);
    }

    response
}

pub fn append_pair_cookies(headers: &mut HeaderMap, pair: &TokenPair, state: &AppState) {
    let max_age = state.auth.refresh_token_ttl.num_seconds();
    let secure = state.auth.cookie_secure;

    if let Some(value) = cookies::set_cookie(ACCESS_TOKEN_COOKIE, &pair.access_token, max_age, secure) {
        headers.append(header::SET_COOKIE, value);
    }
    if let Some(value) = cookies::set_cookie(REFRESH_TOKEN_COOKIE, &pair.refresh_token, max_age, secure) {
        headers.append(header::SET_COOKIE, value);
    }
}

pub fn clear_pair_cookies(headers: &mut HeaderMap, state: &AppState) {
    let secure = state.auth.cookie_secure;

    if let Some(value) = cookies::clear_cookie(ACCESS_TOKEN_COOKIE, secure) {
        headers.append(header::SET_COOKIE, value);
    }
    if let Some(value) = cookies::clear_cookie(REFRESH_TOKEN_COOKIE, secure) {
        headers.append(header::SET_COOKIE, value);
    }
}
