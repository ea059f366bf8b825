pub mod auth_handler;
pub mod health;
pub mod me_handler;
pub mod metrics;
pub mod public_key_handler;
