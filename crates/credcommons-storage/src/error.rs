//! Storage error types.
//!
//! Variants carry the table and key involved so a failure can be diagnosed
//! from the log line alone. Record contents are never included.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open the storage backend at the given path.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a record.
    #[error("failed to read '{key}' from '{table}': {reason}")]
    Read {
        table: &'static str,
        key: String,
        reason: String,
    },

    /// Failed to write a record.
    #[error("failed to write '{key}' to '{table}': {reason}")]
    Write {
        table: &'static str,
        key: String,
        reason: String,
    },

    /// The record targeted by an update does not exist.
    #[error("no record '{key}' in '{table}'")]
    NotFound { table: &'static str, key: String },

    /// A required column family or table was not found.
    #[error("missing column family or table '{name}'")]
    MissingTable { name: String },

    /// A stored record could not be encoded or decoded.
    #[error("record codec failure in '{table}': {reason}")]
    Codec { table: &'static str, reason: String },
}
