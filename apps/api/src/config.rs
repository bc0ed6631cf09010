use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_API_URL;

/// Application configuration loaded from environment variables.
/// Only malformed values are fatal; everything has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// PostgreSQL store when set, seeded in-memory store otherwise.
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub model_timeout: Duration,
    /// `None` means a random key is generated at startup.
    pub token_secret: Option<String>,
    pub chat_capacity: usize,
    pub chat_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: optional_env("DATABASE_URL"),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_api_url: optional_env("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model_timeout: Duration::from_secs(parse_env("MODEL_TIMEOUT_SECS", 120)?),
            token_secret: optional_env("TOKEN_SECRET"),
            chat_capacity: parse_env("CHAT_CAPACITY", 1000)?,
            chat_idle_ttl: Duration::from_secs(60 * parse_env::<u64>("CHAT_IDLE_MINUTES", 60)?),
        })
    }
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
