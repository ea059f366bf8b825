//! Auth service configuration.
//!
//! Loaded from environment variables. The database URL is redacted in Debug
//! output since it usually embeds credentials.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default access token lifetime (1 hour).
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Allowed access token lifetimes.
pub const MIN_ACCESS_TOKEN_TTL_SECONDS: i64 = 60;
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 86_400;

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 604_800;

/// Longest refresh token lifetime (90 days).
pub const MAX_REFRESH_TOKEN_TTL_SECONDS: i64 = 7_776_000;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Bcrypt cost bounds.
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 14;

#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8081").
    pub bind_address: String,

    /// PostgreSQL URL. `None` runs the service on in-memory stores.
    pub database_url: Option<String>,

    /// PKCS#8 PEM file holding the RSA signing key.
    pub private_key_path: PathBuf,

    /// Optional SPKI PEM file; must match the private key when set.
    pub public_key_path: Option<PathBuf>,

    pub access_token_ttl_seconds: i64,

    pub refresh_token_ttl_seconds: i64,

    pub bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid token lifetime configuration: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid bcrypt cost configuration: {0}")]
    InvalidBcryptCost(String),
}

fn parse_i64(vars: &HashMap<String, String>, name: &str, default: i64) -> Result<i64, ConfigError> {
    match vars.get(name) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            ConfigError::InvalidTokenTtl(format!("{name} must be a valid integer, got '{raw}': {e}"))
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let private_key_path = vars
            .get("AUTH_PRIVATE_KEY_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_PRIVATE_KEY_PATH".to_string()))?;

        let public_key_path = vars
            .get("AUTH_PUBLIC_KEY_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let access_token_ttl_seconds =
            parse_i64(vars, "ACCESS_TOKEN_TTL_SECONDS", DEFAULT_ACCESS_TOKEN_TTL_SECONDS)?;
        if !(MIN_ACCESS_TOKEN_TTL_SECONDS..=MAX_ACCESS_TOKEN_TTL_SECONDS)
            .contains(&access_token_ttl_seconds)
        {
            return Err(ConfigError::InvalidTokenTtl(format!(
                "ACCESS_TOKEN_TTL_SECONDS must be between {MIN_ACCESS_TOKEN_TTL_SECONDS} and {MAX_ACCESS_TOKEN_TTL_SECONDS}, got {access_token_ttl_seconds}"
            )));
        }

        let refresh_token_ttl_seconds =
            parse_i64(vars, "REFRESH_TOKEN_TTL_SECONDS", DEFAULT_REFRESH_TOKEN_TTL_SECONDS)?;
        if refresh_token_ttl_seconds <= access_token_ttl_seconds {
            return Err(ConfigError::InvalidTokenTtl(format!(
                "REFRESH_TOKEN_TTL_SECONDS ({refresh_token_ttl_seconds}) must exceed ACCESS_TOKEN_TTL_SECONDS ({access_token_ttl_seconds})"
            )));
        }
        if refresh_token_ttl_seconds > MAX_REFRESH_TOKEN_TTL_SECONDS {
            return Err(ConfigError::InvalidTokenTtl(format!(
                "REFRESH_TOKEN_TTL_SECONDS must not exceed {MAX_REFRESH_TOKEN_TTL_SECONDS}, got {refresh_token_ttl_seconds}"
            )));
        }

        let bcrypt_cost = match vars.get("BCRYPT_COST") {
            Some(raw) => {
                let cost: u32 = raw.trim().parse().map_err(|e| {
                    ConfigError::InvalidBcryptCost(format!(
                        "BCRYPT_COST must be a valid integer, got '{raw}': {e}"
                    ))
                })?;
                if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
                    return Err(ConfigError::InvalidBcryptCost(format!(
                        "BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}, got {cost}"
                    )));
                }
                cost
            }
            None => DEFAULT_BCRYPT_COST,
        };

        Ok(Config {
            bind_address,
            database_url,
            private_key_path,
            public_key_path,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            bcrypt_cost,
        })
    }
}
