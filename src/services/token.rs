use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::modules::auth::interface::{
    AuthError, AuthStore, BlacklistStore, RefreshTokenStore, Result,
};
use crate::modules::auth::model::{RefreshToken, TokenType};

/// Signed claims carried by both halves of a token pair. The pair shares
/// one `jti`, which is the revocation and rotation key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, verifies, rotates and revokes token pairs.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn AuthStore>,
    config: AuthConfig,
}

impl TokenService {
    pub fn new(store: Arc<dyn AuthStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.config.access_token_ttl.num_seconds()
    }

    fn fresh_jti() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.config.token_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Issues a fresh access/refresh pair for `user_id` and persists the
    /// refresh half as a non-revoked row.
    pub async fn issue_pair(&self, user_id: &str) -> Result<TokenPair> {
        let jti = Self::fresh_jti();
        let now = Utc::now();
        let refresh_expires_at = now + self.config.refresh_token_ttl;

        let access_token = self.sign(&Claims {
            user_id: user_id.to_string(),
            token_type: TokenType::Access,
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: (now + self.config.access_token_ttl).timestamp(),
        })?;

        let refresh_token = self.sign(&Claims {
            user_id: user_id.to_string(),
            token_type: TokenType::Refresh,
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        })?;

        self.store
            .create_refresh_token(&RefreshToken {
                id: Uuid::new_v4().to_string(),
                jti,
                user_id: user_id.to_string(),
                token: refresh_token.clone(),
                expires_at: refresh_expires_at,
                revoked: false,
                created_at: now,
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validates signature and expiry and returns the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.token_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })
    }

    /// Decodes claims without checking signature or expiry. Only good for
    /// extracting a jti; never trust the result for authorization.
    pub fn decode_unverified(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    /// A token that does not yield a jti counts as blacklisted.
    pub async fn is_blacklisted(&self, token: &str) -> Result<bool> {
        match self.decode_unverified(token) {
            Some(claims) => self.store.is_jti_blacklisted(&claims.jti).await,
            None => Ok(true),
        }
    }

    /// Rotates a refresh token: revokes the presented one and mints a new
    /// pair under a new jti. Every failure collapses to `RefreshFailed`;
    /// the caller must require re-authentication.
    ///
    /// The revocation is a conditional update, so two concurrent rotations
    /// of the same token produce exactly one new pair.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair> {
        if self.is_blacklisted(refresh_token).await? {
            return Err(AuthError::RefreshFailed);
        }

        let claims = self.verify(refresh_token).map_err(|_| AuthError::RefreshFailed)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::RefreshFailed);
        }

        let revoked = self
            .store
            .revoke_active_refresh_token(&claims.jti, &claims.user_id)
            .await?;
        if !revoked {
            tracing::warn!(user_id = %claims.user_id, "refresh token replay or unknown jti");
            return Err(AuthError::RefreshFailed);
        }

        self.issue_pair(&claims.user_id).await
    }

    /// Blacklists the token's jti until the token's own expiry and revokes
    /// any refresh rows sharing it. Revoking either half of a pair takes
    /// down both, since the pair shares the jti.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let Some(claims) = self.decode_unverified(token) else {
            // Nothing to key a blacklist entry on.
            return Ok(());
        };

        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
            .unwrap_or_else(|| Utc::now() + self.config.refresh_token_ttl);

        self.store.blacklist_jti(&claims.jti, expires_at).await?;
        self.store.revoke_refresh_tokens_by_jti(&claims.jti).await?;

        Ok(())
    }

    /// Drops refresh rows that are expired or revoked and blacklist entries
    /// past their natural expiry. Idempotent; safe to run concurrently.
    pub async fn cleanup(&self) -> Result<()> {
        let now = Utc::now();
        let refresh = self.store.delete_stale_refresh_tokens(now).await?;
        let blacklist = self.store.delete_expired_blacklist(now).await?;
        if refresh > 0 || blacklist > 0 {
            tracing::debug!(refresh, blacklist, "token cleanup removed rows");
        }
        Ok(())
    }
}
