pub mod auth;
pub mod database;
pub mod environment;

pub use auth::AuthConfig;
pub use database::{init_db, DbPool};
