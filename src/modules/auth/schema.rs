use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::auth::model::{TwoFactorStatus, User, UserStatus};
use crate::services::rate_limit::AttemptStats;

// =============================================================================
// REGISTER / LOGIN / LOGOUT
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub tokens: TokenPairResponse,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub tokens: TokenPairResponse,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

// =============================================================================
// CURRENT USER
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub status: UserStatus,
    pub role: String,
    pub two_factor_status: TwoFactorStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            status: user.status,
            role: user.role.clone(),
            two_factor_status: user.two_factor_status,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

// =============================================================================
// TWO-FACTOR
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub qr_code: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorVerifyRequest {
    /// Six-digit TOTP code.
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TwoFactorVerifyResponse {
    pub success: bool,
    /// Present only when this verification activated the second factor.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recovery_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecoveryCodeRequest {
    pub code: String,
}

// =============================================================================
// RATE LIMIT STATUS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RateLimitStatusResponse {
    pub success: bool,
    pub data: AttemptStats,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            retry_after: None,
        }
    }
}
