use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

/// Values shipped in sample `.env` files. The server refuses to sign tokens with them.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("HUDDLE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HUDDLE_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port: u16 = var("HUDDLE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("HUDDLE_PORT must be a port number")?;
        let access_minutes: i64 = var("HUDDLE_ACCESS_TOKEN_MINUTES")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("HUDDLE_ACCESS_TOKEN_MINUTES must be a whole number")?;
        let refresh_days: i64 = var("HUDDLE_REFRESH_TOKEN_DAYS")
            .unwrap_or_else(|| "7".into())
            .parse()
            .context("HUDDLE_REFRESH_TOKEN_DAYS must be a whole number")?;
        if access_minutes <= 0 || refresh_days <= 0 {
            bail!("token lifetimes must be positive");
        }

        Ok(Self {
            host: var("HUDDLE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("HUDDLE_DB_PATH").unwrap_or_else(|| "huddle.db".into()).into(),
            jwt_secret,
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
        })
    }
}
