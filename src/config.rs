// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Minimum percentage for a submission to count as passed.
pub const PASSING_PERCENTAGE: f64 = 70.0;

/// Option columns probed by the importer ("Option A" through "Option H").
pub const MAX_OPTION_COLUMNS: usize = 8;

pub const DEFAULT_TOPIC: &str = "General";
pub const DEFAULT_DIFFICULTY: &str = "Medium";

/// Window covered by the admin attempts-per-day series.
pub const SERIES_DAYS: i64 = 14;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Allowed browser origins. Empty means any origin is accepted.
    pub cors_origins: Vec<String>,
    pub max_upload_mb: usize,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7 * 24 * 60 * 60);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4000);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let admin_email = env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            cors_origins,
            max_upload_mb,
            admin_email,
            admin_password,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
