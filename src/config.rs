//! Environment-driven configuration

use std::env;

/// Runtime configuration, read once at startup
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub carrier_api_base_url: String,
    pub jwt_secret: String,
    pub monitor_interval_minutes: u64,
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(3001),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/kompenzo".to_string()),
            carrier_api_base_url: env::var("CARRIER_API_BASE_URL")
                .unwrap_or_else(|_| "https://ticket-api.cd.cz".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".to_string()),
            monitor_interval_minutes: env::var("MONITOR_INTERVAL_MINUTES")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(30),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}
