//! API gateway configuration.
//!
//! Configuration is loaded from environment variables.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default URL of the auth service's public key endpoint.
pub const DEFAULT_AUTH_PUBLIC_KEY_URL: &str = "http://localhost:8081/api/auth/public-key";

/// Paths forwarded without a bearer token unless `PUBLIC_PATHS` is set.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/api/auth/login",
    "/api/auth/signup",
    "/api/auth/refresh",
    "/api/auth/logout",
    "/api/auth/public-key",
    "/health",
    "/swagger-ui",
    "/v3/api-docs",
];

/// Route table used unless `GATEWAY_ROUTES` is set.
pub const DEFAULT_GATEWAY_ROUTES: &str =
    "/api/auth=http://localhost:8081,/api/users=http://localhost:8081";

/// Default graceful shutdown drain period.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// One entry of the upstream route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    /// Path prefix, matched on segment boundaries.
    pub prefix: String,

    /// Upstream base URL, without trailing slash.
    pub upstream: String,
}

/// API gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Where the verification key is fetched from, once, at boot.
    pub auth_public_key_url: String,

    /// Path prefixes that need no bearer token.
    pub public_paths: Vec<String>,

    /// Upstream route table.
    pub routes: Vec<RouteConfig>,

    /// Tolerance for access tokens issued slightly in the future.
    pub jwt_clock_skew_seconds: i64,

    /// Seconds to keep draining connections after a shutdown signal.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid public path configuration: {0}")]
    InvalidPublicPath(String),

    #[error("Invalid route configuration: {0}")]
    InvalidRoute(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

fn normalize_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let without_slash = trimmed.trim_end_matches('/');
    if without_slash.is_empty() {
        Some("/".to_string())
    } else {
        Some(without_slash.to_string())
    }
}

fn parse_public_paths(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            normalize_prefix(entry).ok_or_else(|| {
                ConfigError::InvalidPublicPath(format!(
                    "PUBLIC_PATHS entries must start with '/', got '{}'",
                    entry.trim()
                ))
            })
        })
        .collect()
}

/// Parse `prefix=url` pairs separated by commas.
fn parse_routes(raw: &str) -> Result<Vec<RouteConfig>, ConfigError> {
    let mut routes = Vec::new();

    for entry in raw.split(',').filter(|entry| !entry.trim().is_empty()) {
        let (prefix, upstream) = entry.split_once('=').ok_or_else(|| {
            ConfigError::InvalidRoute(format!(
                "GATEWAY_ROUTES entries must be 'prefix=url', got '{}'",
                entry.trim()
            ))
        })?;

        let prefix = normalize_prefix(prefix).ok_or_else(|| {
            ConfigError::InvalidRoute(format!(
                "Route prefix must start with '/', got '{}'",
                prefix.trim()
            ))
        })?;

        let upstream = upstream.trim().trim_end_matches('/');
        if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
            return Err(ConfigError::InvalidRoute(format!(
                "Upstream for '{prefix}' must be an http(s) URL, got '{upstream}'"
            )));
        }

        if routes.iter().any(|r: &RouteConfig| r.prefix == prefix) {
            return Err(ConfigError::InvalidRoute(format!(
                "Duplicate route prefix '{prefix}'"
            )));
        }

        routes.push(RouteConfig {
            prefix,
            upstream: upstream.to_string(),
        });
    }

    if routes.is_empty() {
        return Err(ConfigError::InvalidRoute(
            "GATEWAY_ROUTES must contain at least one route".to_string(),
        ));
    }

    Ok(routes)
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

        let auth_public_key_url = vars
            .get("AUTH_PUBLIC_KEY_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUTH_PUBLIC_KEY_URL.to_string());

        let public_paths = match vars.get("PUBLIC_PATHS") {
            Some(raw) => parse_public_paths(raw)?,
            None => DEFAULT_PUBLIC_PATHS.iter().map(|p| (*p).to_string()).collect(),
        };

        let routes = parse_routes(
            vars.get("GATEWAY_ROUTES")
                .map_or(DEFAULT_GATEWAY_ROUTES, String::as_str),
        )?;

        let max_skew = i64::try_from(MAX_CLOCK_SKEW.as_secs()).unwrap_or(i64::MAX);
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > max_skew {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    max_skew, value
                )));
            }

            value
        } else {
            i64::try_from(DEFAULT_CLOCK_SKEW.as_secs()).unwrap_or(max_skew)
        };

        let drain_seconds = match vars.get("GATEWAY_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "GATEWAY_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            auth_public_key_url,
            public_paths,
            routes,
            jwt_clock_skew_seconds,
            drain_seconds,
        })
    }
}
