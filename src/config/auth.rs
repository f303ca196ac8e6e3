use chrono::Duration;

/// Auth configuration passed explicitly into the token service and the
/// authentication middleware at construction time. Tests build their own
/// instances with distinct secrets and lifetimes.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret for signing access and refresh tokens.
    pub token_secret: String,
    /// Lifetime of an access token.
    pub access_token_ttl: Duration,
    /// Lifetime of a refresh token. Also bounds the auth cookie Max-Age.
    pub refresh_token_ttl: Duration,
    /// Whether auth cookies carry the `Secure` attribute.
    pub cookie_secure: bool,
    /// Sliding window over which failed login attempts are counted.
    pub rate_limit_window: Duration,
    /// Failed attempts allowed per client address within the window.
    pub rate_limit_max_failures: i64,
    /// Burst capacity of the process-wide request limiter.
    pub burst_limit: u32,
    /// Issuer label embedded in TOTP provisioning URIs.
    pub totp_issuer: String,
}

impl AuthConfig {
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            cookie_secure: false,
            rate_limit_window: Duration::minutes(15),
            rate_limit_max_failures: 5,
            burst_limit: 10,
            totp_issuer: "Daw Manager".to_string(),
        }
    }
}
