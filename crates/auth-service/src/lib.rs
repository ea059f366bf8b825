//! Auth Service Library
//!
//! Issues RS256 access tokens and rotating refresh tokens, and publishes the
//! verification key for the gateway.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Signing key loading, JWT signing, secrets, password hashing
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `models` - Data models and wire DTOs
//! - `observability` - Metrics
//! - `repositories` - Identity and refresh token stores
//! - `routes` - Router and shared state
//! - `services` - Token issuance

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
