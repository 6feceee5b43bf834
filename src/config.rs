//! Service configuration loaded once from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - MongoDB connection string
//! - `JWT_ACCESS_SECRET` - signing secret for access tokens
//!
//! ## Optional
//! - `DATABASE_NAME` - database name (default: smart_list)
//! - `BIND_ADDR` - listen address (default: 127.0.0.1:8080)
//! - `JWT_ACCESS_TTL_MINUTES` - access token lifetime (default: 15)
//! - `RESET_CODE_TTL_MINUTES` - password reset code lifetime (default: 15)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   outgoing mail; without `SMTP_HOST` mail is only logged

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_DATABASE_NAME: &str = "smart_list";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ACCESS_TTL_MINUTES: u64 = 15;
const DEFAULT_RESET_CODE_TTL_MINUTES: u64 = 15;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_EMAIL_FROM: &str = "\"No Reply\" <no-reply@smartlist.app>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid environment variable {0}: {1}")]
    Invalid(&'static str, String),
}

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

pub struct Config {
    pub bind_addr: String,
    pub database_url: SecretString,
    pub database_name: String,
    pub jwt_access_secret: SecretString,
    pub access_token_ttl: Duration,
    pub reset_code_ttl: Duration,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_access_secret =
            get("JWT_ACCESS_SECRET").ok_or(ConfigError::Missing("JWT_ACCESS_SECRET"))?;

        let access_minutes = parse_or(
            "JWT_ACCESS_TTL_MINUTES",
            get("JWT_ACCESS_TTL_MINUTES"),
            DEFAULT_ACCESS_TTL_MINUTES,
        )?;
        let reset_minutes = parse_or(
            "RESET_CODE_TTL_MINUTES",
            get("RESET_CODE_TTL_MINUTES"),
            DEFAULT_RESET_CODE_TTL_MINUTES,
        )?;
        if access_minutes == 0 {
            return Err(ConfigError::Invalid("JWT_ACCESS_TTL_MINUTES", "0".into()));
        }
        if reset_minutes == 0 {
            return Err(ConfigError::Invalid("RESET_CODE_TTL_MINUTES", "0".into()));
        }

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", get("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                username: get("SMTP_USERNAME").ok_or(ConfigError::Missing("SMTP_USERNAME"))?,
                password: SecretString::from(
                    get("SMTP_PASSWORD").ok_or(ConfigError::Missing("SMTP_PASSWORD"))?,
                ),
                from_address: get("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            }),
            None => None,
        };

        Ok(Config {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: SecretString::from(database_url),
            database_name: get("DATABASE_NAME")
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            jwt_access_secret: SecretString::from(jwt_access_secret),
            access_token_ttl: Duration::from_secs(access_minutes * 60),
            reset_code_ttl: Duration::from_secs(reset_minutes * 60),
            smtp,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("mongodb://localhost:27017".to_string()),
        "JWT_ACCESS_SECRET" => Some("test-access-secret-with-enough-length".to_string()),
        _ => None,
    })
    .expect("test config is complete")
}
