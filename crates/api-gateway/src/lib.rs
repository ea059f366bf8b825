//! API Gateway Library
//!
//! Single entry point for clients. Verifies access tokens locally with the
//! issuer's public key, injects the verified identity into
//! `X-User-ID`/`X-User-Role`, and proxies to upstream services.
//!
//! # Modules
//!
//! - `auth` - Boot-time public key fetch
//! - `config` - Service configuration
//! - `errors` - Error types
//! - `handlers` - Health and metrics
//! - `middleware` - Edge authentication and HTTP metrics
//! - `observability` - Metrics
//! - `proxy` - Route table and forwarding
//! - `public_paths` - Public path allowlist
//! - `routes` - Router

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod proxy;
pub mod public_paths;
pub mod routes;
