//! # Application Configuration
//!
//! Environment-driven configuration. Everything has a sensible default
//! except the token signing secret — starting without `JWT_SECRET` is a
//! fatal configuration error, never a silent fallback to a known key.

use std::time::Duration;

use thiserror::Error;

/// Default HTTP port.
const DEFAULT_PORT: u16 = 5000;
/// Default token lifetime: one hour.
const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 3600;
/// Default SSE keep-alive interval.
const DEFAULT_KEEPALIVE_SECS: u64 = 30;
/// Default CORS origin for local frontend development.
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// A fatal configuration problem detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `JWT_SECRET` is not set. There is no default — tokens signed with a
    /// guessable secret are worse than no auth at all.
    #[error("JWT_SECRET environment variable is required")]
    MissingJwtSecret,

    /// An environment variable is set but unparseable.
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime configuration, resolved once at startup and shared via state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP listener binds to (`PORT`, default 5000).
    pub port: u16,
    /// HS256 signing secret for access tokens (`JWT_SECRET`, required).
    pub jwt_secret: String,
    /// Token lifetime (`JWT_EXPIRES_SECS`, default 3600).
    pub token_expiry: Duration,
    /// SSE keep-alive interval (`SSE_KEEPALIVE_SECS`, default 30).
    pub keepalive: Duration,
    /// Allowed CORS origins (`ALLOWED_ORIGINS`, comma-separated).
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => return Err(ConfigError::MissingJwtSecret),
        };

        Ok(Self {
            port: parse_var("PORT", DEFAULT_PORT)?,
            jwt_secret,
            token_expiry: Duration::from_secs(parse_var(
                "JWT_EXPIRES_SECS",
                DEFAULT_TOKEN_EXPIRY_SECS,
            )?),
            keepalive: Duration::from_secs(parse_var(
                "SSE_KEEPALIVE_SECS",
                DEFAULT_KEEPALIVE_SECS,
            )?),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]),
        })
    }

    /// Configuration for in-process tests: fixed secret, short expiry
    /// knobs left at defaults.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            port: 0,
            jwt_secret: secret.to_string(),
            token_expiry: Duration::from_secs(DEFAULT_TOKEN_EXPIRY_SECS),
            keepalive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}
