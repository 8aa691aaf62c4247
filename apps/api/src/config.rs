use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Origin used to build share and download URLs.
    pub public_base_url: String,
    pub snapshot_debounce: Duration,
    pub export_timeout: Duration,
    pub export_max_bytes: u64,
    /// Sessions untouched this long are flushed and dropped from memory.
    pub session_idle_timeout: Duration,
    /// How long finished export jobs stay pollable.
    pub export_retention: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = optional_env("PORT", 8080u16)?;
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            snapshot_debounce: Duration::from_millis(optional_env("SNAPSHOT_DEBOUNCE_MS", 500u64)?),
            export_timeout: Duration::from_secs(optional_env("EXPORT_TIMEOUT_SECS", 60u64)?),
            export_max_bytes: optional_env("EXPORT_MAX_BYTES", 20 * 1024 * 1024u64)?,
            session_idle_timeout: Duration::from_secs(optional_env("SESSION_IDLE_SECS", 30 * 60u64)?),
            export_retention: Duration::from_secs(optional_env("EXPORT_RETENTION_SECS", 60 * 60u64)?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
