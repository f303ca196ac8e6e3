pub mod cookies;
pub mod hashing;
pub mod rate_limit;
pub mod security;
pub mod token;
pub mod two_factor;
