use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{RefreshToken, Session, TwoFactorStatus, User};

pub type Result<T> = std::result::Result<T, AuthError>;

// =============================================================================
// STORE TRAITS
// =============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<()>;
    async fn set_two_factor(
        &self,
        user_id: &str,
        status: TwoFactorStatus,
        secret: Option<&str>,
    ) -> Result<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<()>;
    /// Counts failed-attempt rows (empty token marker) for an address
    /// created at or after `since`.
    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64>;
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<()>;
    /// Marks the row for `jti` revoked, but only if it is currently active
    /// and owned by `user_id`. Returns whether a row transitioned; concurrent
    /// callers racing on one jti see exactly one `true`.
    async fn revoke_active_refresh_token(&self, jti: &str, user_id: &str) -> Result<bool>;
    /// Marks every row for `jti` revoked regardless of current state.
    async fn revoke_refresh_tokens_by_jti(&self, jti: &str) -> Result<u64>;
    async fn delete_stale_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait BlacklistStore: Send + Sync {
    async fn blacklist_jti(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()>;
    async fn is_jti_blacklisted(&self, jti: &str) -> Result<bool>;
    async fn delete_expired_blacklist(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait RecoveryCodeStore: Send + Sync {
    /// Replaces the user's whole batch in one transaction; a reader never
    /// observes a partial batch.
    async fn replace_recovery_codes(&self, user_id: &str, codes: &[String]) -> Result<()>;
    /// Deletes the matching code if present. Returns whether a code was
    /// consumed; each code redeems at most once.
    async fn consume_recovery_code(&self, user_id: &str, code: &str) -> Result<bool>;
    async fn count_recovery_codes(&self, user_id: &str) -> Result<i64>;
}

/// The credential store as one seam: everything the auth core persists.
pub trait AuthStore:
    UserStore + SessionStore + RefreshTokenStore + BlacklistStore + RecoveryCodeStore
{
}

impl<T> AuthStore for T where
    T: UserStore + SessionStore + RefreshTokenStore + BlacklistStore + RecoveryCodeStore
{
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token revoked")]
    TokenBlacklisted,

    #[error("User not found")]
    UserNotFound,

    #[error("User blocked")]
    UserBlocked,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Refresh not possible")]
    RefreshFailed,

    #[error("Too many failed attempts")]
    RateLimited { retry_after: DateTime<Utc> },

    #[error("Two-factor authentication is not configured")]
    TwoFactorNotConfigured,

    #[error("Invalid two-factor code")]
    TwoFactorCodeInvalid,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            // Every token/identity failure is presented uniformly so a
            // caller cannot distinguish expiry, tampering, blacklisting
            // or a missing account.
            Self::TokenExpired
            | Self::TokenInvalid
            | Self::TokenBlacklisted
            | Self::UserNotFound
            | Self::UserBlocked
            | Self::InvalidCredentials
            | Self::RefreshFailed => StatusCode::UNAUTHORIZED,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::TwoFactorNotConfigured => StatusCode::BAD_REQUEST,
            Self::TwoFactorCodeInvalid => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Token and identity failures all
    /// collapse to one string; the store never leaks through.
    pub fn public_message(&self) -> String {
        match self {
            Self::TokenExpired
            | Self::TokenInvalid
            | Self::TokenBlacklisted
            | Self::UserNotFound
            | Self::UserBlocked
            | Self::RefreshFailed => "Not authenticated".to_string(),
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        use super::schema::ErrorResponse;

        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            tracing::error!(error = %self, "auth request failed");
        }

        let retry_after = match &self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            message: self.public_message(),
            retry_after,
        };

        (self.status_code(), axum::Json(body)).into_response()
    }
}
