//! Server configuration for Credit Commons.
//!
//! Loads configuration from environment variables with development-friendly
//! defaults. Key material is parsed here so a malformed key stops startup
//! instead of surfacing on the first request.

use std::net::SocketAddr;
use std::path::PathBuf;

use credcommons_core::crypto::EnvelopeKey;
use credcommons_core::discovery::DEFAULT_PAGE_LIMIT;
use credcommons_core::error::KeyError;
use credcommons_core::presentation::IssuerKey;

/// Issuer identity used when `VC_ISSUER` is unset.
pub const DEFAULT_ISSUER: &str = "did:jk:credit-commons";

const DEFAULT_PORT: u16 = 8080;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `CREDCOMMONS_BIND_ADDR` or `PORT` could not be parsed.
    #[error("invalid {var} '{value}'")]
    InvalidAddress { var: &'static str, value: String },

    /// A numeric setting could not be parsed.
    #[error("invalid {var} '{value}': expected a non-negative integer")]
    InvalidNumber { var: &'static str, value: String },

    /// A provisioned key is malformed.
    #[error("invalid {var}: {source}")]
    InvalidKey {
        var: &'static str,
        #[source]
        source: KeyError,
    },

    /// `CREDCOMMONS_STORAGE` names an unknown backend.
    #[error("unknown storage backend '{value}' (expected 'memory' or 'rocksdb')")]
    UnknownStorage { value: String },
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// `RocksDB` persistent storage.
    RocksDb { path: String },
}

/// Server configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Issuer identity written into credentials and presentations.
    pub issuer: String,
    /// JSON-lines audit file. `None` disables file audit.
    pub audit_log_path: Option<PathBuf>,
    /// Envelope key for credentials at rest. `None` means generate one.
    pub credential_key: Option<EnvelopeKey>,
    /// Ed25519 presentation key. `None` means generate one.
    pub issuer_key: Option<IssuerKey>,
    /// Static bearer token. `None` disables the gate.
    pub expected_bearer: Option<String>,
    /// Maximum number of discovery results.
    pub discovery_page_limit: usize,
    /// JSON file of borrowers to seed at startup.
    pub borrower_seed_file: Option<PathBuf>,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            issuer: DEFAULT_ISSUER.to_owned(),
            audit_log_path: Some(PathBuf::from("audit.log")),
            credential_key: None,
            issuer_key: None,
            expected_bearer: None,
            discovery_page_limit: DEFAULT_PAGE_LIMIT,
            borrower_seed_file: None,
            storage_backend: StorageBackendType::Memory,
            log_level: "info".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CREDCOMMONS_BIND_ADDR` — full bind address (default: `127.0.0.1:8080`)
    /// - `PORT` — port to bind on `0.0.0.0` (used when `CREDCOMMONS_BIND_ADDR` is unset)
    /// - `VC_ISSUER` — issuer identity (default: `did:jk:credit-commons`)
    /// - `AUDIT_LOG_PATH` — audit file (default: `audit.log`, empty disables)
    /// - `CREDENTIAL_KEY` — base64 32-byte envelope key
    /// - `ED25519_PRIVATE_KEY` — base64 Ed25519 seed (32 bytes) or keypair (64 bytes)
    /// - `EXPECTED_BEARER` — static bearer token (empty disables the gate)
    /// - `DISCOVERY_PAGE_LIMIT` — max discovery results (default: `100`)
    /// - `BORROWER_SEED_FILE` — JSON array of borrower records
    /// - `CREDCOMMONS_STORAGE` — `memory` or `rocksdb` (default: `memory`)
    /// - `CREDCOMMONS_STORAGE_PATH` — path for `RocksDB` (default: `./data`)
    /// - `CREDCOMMONS_LOG_LEVEL` — log filter (default: `info`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any set variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = if let Some(addr) = var("CREDCOMMONS_BIND_ADDR") {
            addr.trim()
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidAddress {
                    var: "CREDCOMMONS_BIND_ADDR",
                    value: addr,
                })?
        } else if let Some(port) = var("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| ConfigError::InvalidAddress {
                var: "PORT",
                value: port.clone(),
            })?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            defaults.bind_addr
        };

        let credential_key = var("CREDENTIAL_KEY")
            .map(|v| EnvelopeKey::from_base64(&v))
            .transpose()
            .map_err(|source| ConfigError::InvalidKey {
                var: "CREDENTIAL_KEY",
                source,
            })?;

        let issuer_key = var("ED25519_PRIVATE_KEY")
            .map(|v| IssuerKey::from_base64(&v))
            .transpose()
            .map_err(|source| ConfigError::InvalidKey {
                var: "ED25519_PRIVATE_KEY",
                source,
            })?;

        let discovery_page_limit = match var("DISCOVERY_PAGE_LIMIT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: "DISCOVERY_PAGE_LIMIT",
                value: v.clone(),
            })?,
            None => defaults.discovery_page_limit,
        };

        let storage_path = var("CREDCOMMONS_STORAGE_PATH").unwrap_or_else(|| "./data".to_owned());
        let storage_backend = match var("CREDCOMMONS_STORAGE")
            .map(|v| v.trim().to_lowercase())
            .as_deref()
        {
            None | Some("memory") => StorageBackendType::Memory,
            Some("rocksdb") => StorageBackendType::RocksDb { path: storage_path },
            Some(other) => {
                return Err(ConfigError::UnknownStorage {
                    value: other.to_owned(),
                });
            }
        };

        // AUDIT_LOG_PATH set to an empty string disables file audit.
        let audit_log_path = match lookup("AUDIT_LOG_PATH") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v)),
            None => defaults.audit_log_path,
        };

        Ok(Self {
            bind_addr,
            issuer: var("VC_ISSUER").unwrap_or(defaults.issuer),
            audit_log_path,
            credential_key,
            issuer_key,
            expected_bearer: var("EXPECTED_BEARER"),
            discovery_page_limit,
            borrower_seed_file: var("BORROWER_SEED_FILE").map(PathBuf::from),
            storage_backend,
            log_level: var("CREDCOMMONS_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}
