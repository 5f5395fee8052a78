//! Credit Commons HTTP server.
//!
//! Wires the core services, storage backend, and HTTP routes into an Axum
//! application. Lender routes (`/discovery`, `/consents`,
//! `/credentials/crc`) and admin routes (`/admin/*`) sit behind the bearer
//! gate; `/health` does not.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod seed;
pub mod state;
