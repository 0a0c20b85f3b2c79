use std::env;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    /// Durable backend. When absent the process runs on the memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,

    pub store_timeout: Duration,
    pub store_fallback: bool,

    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,

    pub mail_webhook_url: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 5001)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_ttl_secs: parse_var("JWT_TTL_SECS", 7 * 24 * 60 * 60)?,

            store_timeout: Duration::from_millis(parse_var("STORE_TIMEOUT_MS", 5000)?),
            store_fallback: parse_var("STORE_FALLBACK", true)?,

            rate_limit_max: parse_var("RATE_LIMIT_MAX", 100)?,
            rate_limit_window_secs: parse_var("RATE_LIMIT_WINDOW_SECS", 15 * 60)?,

            mail_webhook_url: env::var("MAIL_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "\"Roster.AI\" <noreply@roster.ai>".into()),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret".into(),
            jwt_ttl_secs: 7 * 24 * 60 * 60,
            store_timeout: Duration::from_millis(200),
            store_fallback: true,
            rate_limit_max: 100,
            rate_limit_window_secs: 900,
            mail_webhook_url: None,
            mail_from: "test@roster.ai".into(),
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
