//! Environment-driven configuration for the casework core.
//!
//! # Responsibility
//! - Read every tunable from `CASEWORK_*` variables with documented defaults.
//! - Reject malformed values instead of silently falling back.
//!
//! # Invariants
//! - `1 <= default_page_size <= max_page_size`.
//! - The token secret and token TTL are never empty/zero.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_LOG_LEVEL: &str = "CASEWORK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CASEWORK_LOG_DIR";
pub const ENV_TOKEN_SECRET: &str = "CASEWORK_TOKEN_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "CASEWORK_TOKEN_TTL_SECS";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "CASEWORK_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "CASEWORK_MAX_PAGE_SIZE";
pub const ENV_OPERATOR_USER: &str = "CASEWORK_OPERATOR_USER";
pub const ENV_OPERATOR_PASSWORD: &str = "CASEWORK_OPERATOR_PASSWORD";
pub const ENV_OPERATOR_NAME: &str = "CASEWORK_OPERATOR_NAME";
pub const ENV_STORE: &str = "CASEWORK_STORE";
pub const ENV_DB_PATH: &str = "CASEWORK_DB_PATH";

const DEV_TOKEN_SECRET: &str = "casework-dev-secret-change-me";
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Configuration error with the offending variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        message: String,
    },
    Inconsistent(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                message,
            } => write!(f, "invalid value `{value}` for {key}: {message}"),
            Self::Inconsistent(message) => write!(f, "inconsistent configuration: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Logging destination and verbosity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Rolling-file directory. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

/// Session token signing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_secs: u64,
}

/// Listing pagination limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Page size applied when the caller sends none.
    pub default_page_size: u32,
    /// Larger requested page sizes are clamped to this value.
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// The single operator account accepted by `Authenticator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

/// Record store backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    /// `None` opens an in-memory SQLite database.
    Sqlite { path: Option<PathBuf> },
}

/// Full core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub logging: LoggingConfig,
    pub token: TokenConfig,
    pub paging: PagingConfig,
    pub operator: OperatorConfig,
    pub store: StoreBackend,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: crate::logging::default_log_level().to_string(),
                log_dir: None,
            },
            token: TokenConfig {
                secret: DEV_TOKEN_SECRET.to_string(),
                ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            },
            paging: PagingConfig::default(),
            operator: OperatorConfig {
                username: "admin".to_string(),
                password: "admin123".to_string(),
                display_name: "Administrador".to_string(),
            },
            store: StoreBackend::Memory,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    /// - Returns `InvalidValue` for unparsable numbers or unknown backends.
    /// - Returns `Inconsistent` when page sizes or token settings conflict.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let level = read(ENV_LOG_LEVEL).unwrap_or_else(|| defaults.logging.level.clone());
        let log_dir = read(ENV_LOG_DIR).map(PathBuf::from);

        let secret = match read(ENV_TOKEN_SECRET) {
            Some(secret) => secret,
            None => {
                warn!(
                    "event=config_default module=config key={ENV_TOKEN_SECRET} status=insecure"
                );
                defaults.token.secret.clone()
            }
        };
        let ttl_secs = parse_or(&read, ENV_TOKEN_TTL_SECS, defaults.token.ttl_secs)?;

        let paging = PagingConfig {
            default_page_size: parse_or(
                &read,
                ENV_DEFAULT_PAGE_SIZE,
                defaults.paging.default_page_size,
            )?,
            max_page_size: parse_or(&read, ENV_MAX_PAGE_SIZE, defaults.paging.max_page_size)?,
        };

        let operator = OperatorConfig {
            username: read(ENV_OPERATOR_USER).unwrap_or(defaults.operator.username),
            password: read(ENV_OPERATOR_PASSWORD).unwrap_or(defaults.operator.password),
            display_name: read(ENV_OPERATOR_NAME).unwrap_or(defaults.operator.display_name),
        };

        let store = match read(ENV_STORE).as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("sqlite") => StoreBackend::Sqlite {
                path: read(ENV_DB_PATH).map(PathBuf::from),
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: ENV_STORE,
                    value: other.to_string(),
                    message: "expected memory|sqlite".to_string(),
                })
            }
        };

        let config = Self {
            logging: LoggingConfig { level, log_dir },
            token: TokenConfig { secret, ttl_secs },
            paging,
            operator,
            store,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.paging.default_page_size == 0 || self.paging.max_page_size == 0 {
            return Err(ConfigError::Inconsistent(
                "page sizes must be at least 1".to_string(),
            ));
        }
        if self.paging.default_page_size > self.paging.max_page_size {
            return Err(ConfigError::Inconsistent(format!(
                "default page size {} exceeds max page size {}",
                self.paging.default_page_size, self.paging.max_page_size
            )));
        }
        if self.token.ttl_secs == 0 {
            return Err(ConfigError::Inconsistent(
                "token ttl must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T, R>(read: &R, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    R: Fn(&str) -> Option<String>,
{
    match read(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err: T::Err| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                message: err.to_string(),
            }),
        None => {
            info!("event=config_default module=config key={key} value={default}");
            Ok(default)
        }
    }
}
