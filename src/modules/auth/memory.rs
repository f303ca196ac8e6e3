use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::modules::auth::interface::{
    BlacklistStore, RecoveryCodeStore, RefreshTokenStore, Result, SessionStore, UserStore,
};
use crate::modules::auth::model::{RefreshToken, Session, TwoFactorStatus, User};

/// In-memory credential store. Backs the integration tests and single-node
/// development runs; the lock is never held across an await point.
#[derive(Default)]
pub struct MemoryAuthStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    sessions: Vec<Session>,
    refresh_tokens: Vec<RefreshToken>,
    blacklist: HashMap<String, DateTime<Utc>>,
    recovery_codes: HashMap<String, HashSet<String>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryAuthStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().any(|u| u.email == email))
    }

    async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.get_mut(user_id) {
            user.last_login_at = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn set_two_factor(
        &self,
        user_id: &str,
        status: TwoFactorStatus,
        secret: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.get_mut(user_id) {
            user.two_factor_status = status;
            user.two_factor_secret = secret.map(str::to_string);
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryAuthStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.push(session.clone());
        Ok(())
    }

    async fn count_failed_attempts(&self, ip_address: &str, since: DateTime<Utc>) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        let count = inner
            .sessions
            .iter()
            .filter(|s| s.ip_address == ip_address && s.token.is_empty() && s.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.expires_at >= now);
        Ok((before - inner.sessions.len()) as u64)
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryAuthStore {
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.refresh_tokens.push(token.clone());
        Ok(())
    }

    async fn revoke_active_refresh_token(&self, jti: &str, user_id: &str) -> Result<bool> {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        // Test-and-set under the store lock, same contract as the SQL
        // conditional update.
        match inner
            .refresh_tokens
            .iter_mut()
            .find(|t| t.jti == jti && t.user_id == user_id && !t.revoked && t.expires_at > now)
        {
            Some(token) => {
                token.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_refresh_tokens_by_jti(&self, jti: &str) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut revoked = 0;
        for token in inner.refresh_tokens.iter_mut().filter(|t| t.jti == jti) {
            token.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_stale_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.refresh_tokens.len();
        inner.refresh_tokens.retain(|t| !t.revoked && t.expires_at >= now);
        Ok((before - inner.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl BlacklistStore for MemoryAuthStore {
    async fn blacklist_jti(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.blacklist.entry(jti.to_string()).or_insert(expires_at);
        Ok(())
    }

    async fn is_jti_blacklisted(&self, jti: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.blacklist.contains_key(jti))
    }

    async fn delete_expired_blacklist(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.blacklist.len();
        inner.blacklist.retain(|_, expires_at| *expires_at >= now);
        Ok((before - inner.blacklist.len()) as u64)
    }
}

#[async_trait]
impl RecoveryCodeStore for MemoryAuthStore {
    async fn replace_recovery_codes(&self, user_id: &str, codes: &[String]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .recovery_codes
            .insert(user_id.to_string(), codes.iter().cloned().collect());
        Ok(())
    }

    async fn consume_recovery_code(&self, user_id: &str, code: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .recovery_codes
            .get_mut(user_id)
            .is_some_and(|codes| codes.remove(code)))
    }

    async fn count_recovery_codes(&self, user_id: &str) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .recovery_codes
            .get(user_id)
            .map_or(0, |codes| codes.len() as i64))
    }
}
