use std::{env, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub db_connect_timeout: Duration,
    pub db_retry_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 8001)?;
        let jwt_ttl_hours = parse_var("JWT_TTL_HOURS", 24)?;
        let db_connect_timeout = Duration::from_secs(parse_var("DB_CONNECT_TIMEOUT_SECS", 30)?);
        let db_retry_interval = Duration::from_secs(parse_var("DB_RETRY_SECS", 5)?);
        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            db_connect_timeout,
            db_retry_interval,
        })
    }
}

// Unset falls back to the default; set-but-malformed is an error.
fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {name} '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}
