use std::sync::Arc;

use auth_gate::config::{environment::Config, init_db, AuthConfig};
use auth_gate::modules::auth::crud::MySqlAuthStore;
use auth_gate::modules::auth::interface::SessionStore;
use auth_gate::services::token::TokenService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load environment configuration");

    let db = init_db(&config.database_url)
        .await
        .expect("Failed to connect to MySQL");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Connected to MySQL");

    let store = Arc::new(MySqlAuthStore::new(db));

    let mut auth = AuthConfig::new(config.jwt_secret);
    auth.cookie_secure = config.production;
    auth.totp_issuer = config.totp_issuer;

    // Hourly housekeeping: spent refresh rows, expired blacklist entries
    // and expired login-attempt records.
    let maintenance_tokens = TokenService::new(store.clone(), auth.clone());
    let maintenance_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(err) = maintenance_tokens.cleanup().await {
                tracing::warn!(error = %err, "token cleanup failed");
            }
            if let Err(err) = maintenance_store
                .delete_expired_sessions(chrono::Utc::now())
                .await
            {
                tracing::warn!(error = %err, "session cleanup failed");
            }
        }
    });

    let app = auth_gate::create_app(store, auth).await;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
