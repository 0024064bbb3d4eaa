//! Configuration loading from environment.

use std::env;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub webhook_secret: Option<String>,
    pub admin_api_key: Option<String>,
    pub requests_per_minute: u32,
    pub trust_proxy: bool,
    pub otel_enabled: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "3003".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a port number: {}", e))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let requests_per_minute = lookup("RATE_LIMIT_PER_MINUTE")
            .map(|v| v.parse())
            .transpose()
            .map_err(|e| anyhow::anyhow!("RATE_LIMIT_PER_MINUTE must be a number: {}", e))?
            .unwrap_or(600);

        let otel_enabled = lookup("OTEL_ENABLED").map(|v| flag(&v)).unwrap_or(true);
        let trust_proxy = lookup("TRUST_PROXY").map(|v| flag(&v)).unwrap_or(false);

        Ok(Self {
            port,
            database_url,
            webhook_secret: lookup("WEBHOOK_SECRET").filter(|s| !s.is_empty()),
            admin_api_key: lookup("ADMIN_API_KEY").filter(|s| !s.is_empty()),
            requests_per_minute,
            trust_proxy,
            otel_enabled,
        })
    }
}

fn flag(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
