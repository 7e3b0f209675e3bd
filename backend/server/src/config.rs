use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use tracing::{info, warn};

use crate::{dashboard::DashboardStrategy, error::ConfigError};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}', expected redis or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub dashboard_strategy: DashboardStrategy,
    pub frontend_origin: HeaderValue,
    pub user_cookie_max_age: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let redis_url: String = try_load("REDIS_URL", "redis://redis:6379")?;
        let cookie_days: u64 = try_load("USER_COOKIE_MAX_AGE_DAYS", "30")?;

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            store_backend: try_load("STORE_BACKEND", "redis")?,
            redis_url: match read_secret("REDIS_PASSWORD") {
                Some(password) => with_password(&redis_url, &password),
                None => redis_url,
            },
            dashboard_strategy: try_load("DASHBOARD_STRATEGY", "client")?,
            frontend_origin: try_load("FRONTEND_ORIGIN", "http://localhost:5173")?,
            user_cookie_max_age: cookie_max_age(cookie_days)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            store_backend: StoreBackend::Memory,
            redis_url: "redis://redis:6379".to_string(),
            dashboard_strategy: DashboardStrategy::Client,
            frontend_origin: HeaderValue::from_static("http://localhost:5173"),
            user_cookie_max_age: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

fn cookie_max_age(days: u64) -> Result<Duration, ConfigError> {
    days.checked_mul(24 * 60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            key: "USER_COOKIE_MAX_AGE_DAYS".to_string(),
            reason: format!("{days} days does not fit in seconds"),
        })
}

/// Docker secrets are optional here, a missing file just means the feature is off.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("{SECRETS_DIR}/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("{secret_name} not read from {path}: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

/// Injects a password into a `redis://host` style URL that does not carry credentials yet.
fn with_password(redis_url: &str, password: &str) -> String {
    match redis_url.split_once("://") {
        Some((scheme, rest)) if !rest.contains('@') => format!("{scheme}://:{password}@{rest}"),
        _ => {
            warn!("REDIS_URL already carries credentials, ignoring REDIS_PASSWORD secret");
            redis_url.to_string()
        }
    }
}
