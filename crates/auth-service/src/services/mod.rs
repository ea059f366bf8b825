pub mod issuer_service;

pub use issuer_service::{IssuerService, IssuerSettings};
