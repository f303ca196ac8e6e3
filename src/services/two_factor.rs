use std::sync::Arc;

use rand::Rng;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::modules::auth::interface::{
    AuthError, AuthStore, RecoveryCodeStore, Result, UserStore,
};
use crate::modules::auth::model::TwoFactorStatus;

const RECOVERY_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const RECOVERY_CODE_LEN: usize = 8;
pub const RECOVERY_CODE_COUNT: usize = 10;

#[derive(Debug)]
pub struct TwoFactorSetup {
    /// PNG data URI of the provisioning QR code.
    pub qr_code: String,
    /// Base32 secret, for manual authenticator entry.
    pub secret: String,
}

/// TOTP second factor: enrollment, code verification and recovery codes.
#[derive(Clone)]
pub struct TwoFactorService {
    store: Arc<dyn AuthStore>,
    issuer: String,
}

impl TwoFactorService {
    pub fn new(store: Arc<dyn AuthStore>, issuer: impl Into<String>) -> Self {
        Self {
            store,
            issuer: issuer.into(),
        }
    }

    fn totp(&self, base32_secret: &str, account: &str) -> Result<TOTP> {
        let secret = Secret::Encoded(base32_secret.to_string())
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("bad TOTP secret: {e:?}")))?;
        self.totp_from_bytes(secret, account)
    }

    fn totp_from_bytes(&self, secret: Vec<u8>, account: &str) -> Result<TOTP> {
        // 6 digits, 30s step, one step of clock skew either way.
        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| AuthError::Internal(format!("TOTP init failed: {e}")))
    }

    /// Generates a fresh secret for the user, stores it with status PENDING
    /// and returns the provisioning QR plus the base32 secret.
    pub async fn setup_secret(&self, user_id: &str) -> Result<TwoFactorSetup> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let raw = Secret::generate_secret()
            .to_bytes()
            .map_err(|e| AuthError::Internal(format!("secret generation failed: {e:?}")))?;
        let totp = self.totp_from_bytes(raw, &user.email)?;
        let secret = totp.get_secret_base32();

        let qr = totp
            .get_qr_base64()
            .map_err(|e| AuthError::Internal(format!("QR generation failed: {e}")))?;

        self.store
            .set_two_factor(user_id, TwoFactorStatus::Pending, Some(&secret))
            .await?;

        Ok(TwoFactorSetup {
            qr_code: format!("data:image/png;base64,{qr}"),
            secret,
        })
    }

    /// Checks a submitted TOTP code. The first successful check while the
    /// user is PENDING activates the second factor and mints the recovery
    /// code batch, which is returned exactly once.
    pub async fn verify_code(&self, user_id: &str, code: &str) -> Result<Vec<String>> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let Some(secret) = user.two_factor_secret.as_deref() else {
            return Err(AuthError::TwoFactorNotConfigured);
        };

        let totp = self.totp(secret, &user.email)?;
        if !totp.check_current(code).unwrap_or(false) {
            return Err(AuthError::TwoFactorCodeInvalid);
        }

        if user.two_factor_status == TwoFactorStatus::Pending {
            self.store
                .set_two_factor(user_id, TwoFactorStatus::Active, Some(secret))
                .await?;
            return self.regenerate_recovery_codes(user_id, RECOVERY_CODE_COUNT).await;
        }

        Ok(Vec::new())
    }

    /// Redeems a single-use recovery code for an account with an active
    /// second factor. Consumption and check are one store operation.
    pub async fn redeem_recovery_code(&self, user_id: &str, code: &str) -> Result<()> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.two_factor_status != TwoFactorStatus::Active {
            return Err(AuthError::TwoFactorNotConfigured);
        }

        if !self.store.consume_recovery_code(user_id, code).await? {
            return Err(AuthError::TwoFactorCodeInvalid);
        }

        Ok(())
    }

    /// Replaces the user's whole recovery batch with `count` fresh codes.
    /// The store swap is transactional; old and new batches never mix.
    pub async fn regenerate_recovery_codes(
        &self,
        user_id: &str,
        count: usize,
    ) -> Result<Vec<String>> {
        let codes: Vec<String> = (0..count).map(|_| Self::random_code()).collect();
        self.store.replace_recovery_codes(user_id, &codes).await?;
        Ok(codes)
    }

    fn random_code() -> String {
        let mut rng = rand::rng();
        (0..RECOVERY_CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..RECOVERY_CODE_CHARSET.len());
                RECOVERY_CODE_CHARSET[idx] as char
            })
            .collect()
    }
}
