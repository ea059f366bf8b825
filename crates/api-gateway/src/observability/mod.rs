//! Observability for the API gateway.
//!
//! Tokens, identities and raw paths never appear in metric labels. Route
//! labels are the configured prefixes.

pub mod metrics;
