use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DbPool;
use crate::modules::auth::interface::{
    BlacklistStore, RecoveryCodeStore, RefreshTokenStore, Result, SessionStore, UserStore,
};
use crate::modules::auth::model::{RefreshToken, Session, TwoFactorStatus, User};

/// MySQL-backed credential store.
#[derive(Clone)]
pub struct MySqlAuthStore {
    pool: DbPool,
}

impl MySqlAuthStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for MySqlAuthStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, status, role, two_factor_status, two_factor_secret, last_login_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status)
        .bind(&user.role)
        .bind(user.two_factor_status)
        .bind(&user.two_factor_secret)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }

    async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_two_factor(
        &self,
        user_id: &str,
        status: TwoFactorStatus,
        secret: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET two_factor_status = ?, two_factor_secret = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(secret)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for MySqlAuthStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, ip_address, user_agent, token, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(&session.token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE ip_address = ? AND token = '' AND created_at >= ?",
        )
        .bind(ip_address)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RefreshTokenStore for MySqlAuthStore {
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, jti, user_id, token, expires_at, revoked, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.jti)
        .bind(&token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_active_refresh_token(&self, jti: &str, user_id: &str) -> Result<bool> {
        // Conditional update doubles as the rotation lock: of all callers
        // racing on one jti, exactly one sees an affected row.
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND user_id = ? AND revoked = FALSE AND expires_at > ?",
        )
        .bind(jti)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh_tokens_by_jti(&self, jti: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_stale_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ? OR revoked = TRUE")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BlacklistStore for MySqlAuthStore {
    async fn blacklist_jti(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        // Revoking both tokens of a pair hits the same jti twice.
        sqlx::query(
            "INSERT IGNORE INTO blacklisted_tokens (jti, expires_at, created_at) VALUES (?, ?, ?)",
        )
        .bind(jti)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_jti_blacklisted(&self, jti: &str) -> Result<bool> {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM blacklisted_tokens WHERE jti = ?")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;

        Ok(result.0 > 0)
    }

    async fn delete_expired_blacklist(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RecoveryCodeStore for MySqlAuthStore {
    async fn replace_recovery_codes(&self, user_id: &str, codes: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recovery_codes WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        for code in codes {
            sqlx::query(
                "INSERT INTO recovery_codes (id, user_id, code, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(code)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn consume_recovery_code(&self, user_id: &str, code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recovery_codes WHERE user_id = ? AND code = ?")
            .bind(user_id)
            .bind(code)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_recovery_codes(&self, user_id: &str) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recovery_codes WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
