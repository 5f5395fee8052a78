//! HTTP route modules.

pub mod admin;
pub mod consents;
pub mod credentials;
pub mod discovery;
pub mod health;
