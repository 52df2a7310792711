//! Configuration loading from environment.

use std::env;

use modelhooks_types::Environment;

const DEFAULT_PORT: &str = "3000";
const DEFAULT_DATABASE_URL: &str = "sqlite://modelhooks.db?mode=rwc";
const DEFAULT_MANAGER_URL: &str = "http://localhost:4000";

/// Manager service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub enabled: bool,
    pub url: String,
    pub token: Option<String>,
    pub secret: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub database_url: String,
    pub enable_api_error_handler: bool,
    pub manager: ManagerConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let environment = lookup("APP_ENV")
            .map(|v| v.parse::<Environment>().unwrap_or_default())
            .unwrap_or_default();

        let port = lookup("PORT")
            .unwrap_or_else(|| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a port number: {}", e))?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let enable_api_error_handler = flag(&lookup, "API_ERROR_HANDLER", true)?;

        let manager = ManagerConfig {
            enabled: flag(&lookup, "MANAGER_ENABLED", false)?,
            url: lookup("MANAGER_URL").unwrap_or_else(|| DEFAULT_MANAGER_URL.to_string()),
            token: lookup("MANAGER_TOKEN").filter(|v| !v.is_empty()),
            secret: lookup("MANAGER_SECRET").filter(|v| !v.is_empty()),
        };

        Ok(Self {
            environment,
            port,
            database_url,
            enable_api_error_handler,
            manager,
        })
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got {:?}", key, other),
    }
}
