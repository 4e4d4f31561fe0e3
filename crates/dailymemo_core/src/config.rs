//! Process-wide configuration.
//!
//! # Responsibility
//! - Load settings once at startup from environment variables.
//! - Reject unusable settings before any request is served.
//!
//! # Invariants
//! - A `CoreConfig` is read-only after construction and is passed by
//!   reference; nothing in the core reads the environment on its own.
//! - A missing token secret or admission code is a startup error, never a
//!   per-request one.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "DAILYMEMO_DB_PATH";
pub const ENV_TOKEN_SECRET: &str = "DAILYMEMO_TOKEN_SECRET";
pub const ENV_ACCESS_TTL_MINUTES: &str = "DAILYMEMO_ACCESS_TTL_MINUTES";
pub const ENV_REFRESH_TTL_HOURS: &str = "DAILYMEMO_REFRESH_TTL_HOURS";
pub const ENV_ADMISSION_CODE: &str = "DAILYMEMO_ADMISSION_CODE";
pub const ENV_PASSWORD_HASH_COST: &str = "DAILYMEMO_PASSWORD_HASH_COST";
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "DAILYMEMO_DB_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "DAILYMEMO_LOG_LEVEL";

const DEFAULT_DB_PATH: &str = "dailymemo.sqlite3";
const DEFAULT_ACCESS_TTL_MINUTES: u64 = 60;
const DEFAULT_REFRESH_TTL_HOURS: u64 = 24 * 7;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MIN_TOKEN_SECRET_BYTES: usize = 16;
const MIN_HASH_COST: u32 = 4;

/// Upper bound for either token lifetime: ten years.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 366 * 24 * 3600);
const MAX_HASH_COST: u32 = 31;

/// Fatal configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is unset or empty.
    Missing(&'static str),
    /// Variable is set but cannot be parsed.
    Invalid { key: &'static str, value: String },
    /// Parsed values violate a cross-field rule.
    Inconsistent(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "required setting `{key}` is not set"),
            Self::Invalid { key, value } => write!(f, "invalid value `{value}` for `{key}`"),
            Self::Inconsistent(message) => write!(f, "inconsistent configuration: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings shared by every request for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// HMAC key for access and refresh tokens.
    pub token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Shared code required to self-register.
    pub admission_code: String,
    pub password_hash_cost: u32,
    /// Store-side deadline for waiting on a locked database.
    pub busy_timeout: Duration,
    pub log_level: String,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("db_path", &self.db_path)
            .field("token_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("admission_code", &"<redacted>")
            .field("password_hash_cost", &self.password_hash_cost)
            .field("busy_timeout", &self.busy_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl CoreConfig {
    /// Builds a config with defaults for everything except the two secrets.
    pub fn new(token_secret: impl Into<String>, admission_code: impl Into<String>) -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            token_secret: token_secret.into(),
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TTL_MINUTES * 60),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TTL_HOURS * 3600),
            admission_code: admission_code.into(),
            password_hash_cost: bcrypt::DEFAULT_COST,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            log_level: default_log_level().to_string(),
        }
    }

    /// Loads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads and validates configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let token_secret = read(ENV_TOKEN_SECRET).ok_or(ConfigError::Missing(ENV_TOKEN_SECRET))?;
        let admission_code =
            read(ENV_ADMISSION_CODE).ok_or(ConfigError::Missing(ENV_ADMISSION_CODE))?;
        let mut config = Self::new(token_secret, admission_code);

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(ttl) = parse_ttl(ENV_ACCESS_TTL_MINUTES, read(ENV_ACCESS_TTL_MINUTES), 60)? {
            config.access_token_ttl = ttl;
        }
        if let Some(ttl) = parse_ttl(ENV_REFRESH_TTL_HOURS, read(ENV_REFRESH_TTL_HOURS), 3600)? {
            config.refresh_token_ttl = ttl;
        }
        if let Some(cost) = parse_number::<u32>(ENV_PASSWORD_HASH_COST, read(ENV_PASSWORD_HASH_COST))? {
            config.password_hash_cost = cost;
        }
        if let Some(millis) = parse_number::<u64>(ENV_DB_BUSY_TIMEOUT_MS, read(ENV_DB_BUSY_TIMEOUT_MS))? {
            config.busy_timeout = Duration::from_millis(millis);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_ascii_lowercase();
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(ConfigError::Inconsistent(format!(
                "token secret must be at least {MIN_TOKEN_SECRET_BYTES} bytes"
            )));
        }
        if self.admission_code.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_ADMISSION_CODE));
        }
        if self.access_token_ttl.is_zero() {
            return Err(ConfigError::Inconsistent(
                "access token ttl must be positive".to_string(),
            ));
        }
        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(ConfigError::Inconsistent(
                "refresh token ttl must exceed access token ttl".to_string(),
            ));
        }
        if self.refresh_token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::Inconsistent(format!(
                "token ttl must not exceed {}s",
                MAX_TOKEN_TTL.as_secs()
            )));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ConfigError::Invalid {
                key: ENV_PASSWORD_HASH_COST,
                value: self.password_hash_cost.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Parses a count of `unit_secs`-long units into a duration.
fn parse_ttl(
    key: &'static str,
    value: Option<String>,
    unit_secs: u64,
) -> Result<Option<Duration>, ConfigError> {
    let raw = value.clone();
    match parse_number::<u64>(key, value)? {
        None => Ok(None),
        Some(count) => count
            .checked_mul(unit_secs)
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or(ConfigError::Invalid {
                key,
                value: raw.unwrap_or_default(),
            }),
    }
}
