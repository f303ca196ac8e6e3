use std::sync::Arc;

use auth_gate::config::AuthConfig;
use auth_gate::modules::auth::memory::MemoryAuthStore;
use axum_test::TestServer;

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub store: Arc<MemoryAuthStore>,
    pub config: AuthConfig,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(MemoryAuthStore::new());
        let app = auth_gate::create_app(store.clone(), config.clone()).await;
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            store,
            config,
        }
    }
}

#[allow(dead_code)]
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::new("integration-test-secret-0123456789abcdef");
    // Headroom for multi-request scenarios against one server.
    config.burst_limit = 1000;
    config
}

// Helper to generate unique test email
#[allow(dead_code)]
pub fn test_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}

// Helper to generate test password
#[allow(dead_code)]
pub fn test_password() -> &'static str {
    "TestPassword123!"
}

/// Cookie header value carrying an access/refresh pair.
#[allow(dead_code)]
pub fn cookie_pair(access_token: &str, refresh_token: &str) -> String {
    format!("access_token={access_token}; refresh_token={refresh_token}")
}
