//! Process configuration, read from the environment at startup.

use chrono::Duration;

const DEFAULT_ACCESS_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });
        let jwt_refresh_secret = std::env::var("JWT_REFRESH_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_REFRESH_SECRET not set; using insecure dev default");
            "dev-refresh-secret".to_string()
        });

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://vitrine.sqlite?mode=rwc".to_string()),
            jwt_secret,
            jwt_refresh_secret,
            access_ttl: Duration::seconds(env_i64("JWT_EXPIRES_SECS", DEFAULT_ACCESS_TTL_SECS)),
            refresh_ttl: Duration::seconds(env_i64(
                "JWT_REFRESH_EXPIRES_SECS",
                DEFAULT_REFRESH_TTL_SECS,
            )),
        }
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
