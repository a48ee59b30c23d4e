//! Service configuration.
//!
//! Loaded from environment variables. Every variable has a default; values
//! that are present but unparseable fail start-up with the variable named.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use accountd_observability::LogFormat;

pub const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";
const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19_456;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration.
///
/// Custom `Debug` redacts secrets.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub admin_username: String,
    pub admin_password: String,
    pub argon2_memory_kib: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("log_format", &self.log_format)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"[REDACTED]")
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Variables:
    /// - `ACCOUNTD_BIND` (default: `0.0.0.0:8080`)
    /// - `JWT_SECRET` (default: insecure dev secret)
    /// - `ACCOUNTD_TOKEN_TTL_SECS` (default: 86400)
    /// - `ACCOUNTD_REQUEST_TIMEOUT_SECS` (default: 30)
    /// - `ACCOUNTD_LOG_FORMAT` (`json` | `pretty`, default: `json`)
    /// - `ACCOUNTD_ADMIN_USERNAME` / `ACCOUNTD_ADMIN_PASSWORD` (default: `admin` / `admin`)
    /// - `ACCOUNTD_ARGON2_MEMORY_KIB` (default: 19456)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let ttl_secs: i64 = parse(var("ACCOUNTD_TOKEN_TTL_SECS"), "ACCOUNTD_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCOUNTD_TOKEN_TTL_SECS",
                value: ttl_secs.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let log_format = match var("ACCOUNTD_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                var: "ACCOUNTD_LOG_FORMAT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr: parse(var("ACCOUNTD_BIND"), "ACCOUNTD_BIND", default_bind())?,
            jwt_secret: var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            token_ttl: chrono::Duration::seconds(ttl_secs),
            request_timeout: Duration::from_secs(parse(
                var("ACCOUNTD_REQUEST_TIMEOUT_SECS"),
                "ACCOUNTD_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            log_format,
            admin_username: var("ACCOUNTD_ADMIN_USERNAME").unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password: var("ACCOUNTD_ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            argon2_memory_kib: parse(
                var("ACCOUNTD_ARGON2_MEMORY_KIB"),
                "ACCOUNTD_ARGON2_MEMORY_KIB",
                DEFAULT_ARGON2_MEMORY_KIB,
            )?,
        })
    }

    /// Warn about insecure defaults still in effect. Call after logging is up.
    pub fn warn_insecure_defaults(&self) {
        if self.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
        }
        if self.admin_password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!(username = %self.admin_username, "bootstrap admin uses the default password");
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn parse<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
