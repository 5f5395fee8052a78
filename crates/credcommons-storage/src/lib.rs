//! Storage contract for Credit Commons.
//!
//! This crate defines the [`CommonsStore`] trait, the read/write surface the
//! core depends on for borrowers, consents, and credential records, plus the
//! record types that flow through it. It knows nothing about encryption or
//! signing: credential payloads arrive here already sealed by the envelope
//! cipher in `credcommons-core`.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`] — in-memory tables, the default for development and tests
//! - [`RocksDbStore`] — persistent, one column family per table (feature `rocksdb-backend`)

mod error;
mod memory;
mod records;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use records::{BorrowerRecord, CONSENT_STATUS_ACTIVE, Consent, CredentialRecord};
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDbStore;

/// Persistent tables backing the consent and credential pipeline.
///
/// Each write replaces a single record atomically. Reads may run
/// concurrently; a write to a table is exclusive with other access to that
/// table. There are no cross-table transactions.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait CommonsStore: Send + Sync + 'static {
    /// List borrowers matching the filters.
    ///
    /// An empty `district` or `sector` matches every value. At most `limit`
    /// records are returned. Ordering is backend-defined: [`MemoryStore`]
    /// keeps provisioning order, `RocksDbStore` returns records sorted by
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn list_borrowers(
        &self,
        district: &str,
        sector: &str,
        limit: usize,
    ) -> Result<Vec<BorrowerRecord>, StorageError>;

    /// Provision a borrower, replacing any record with the same reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn save_borrower(&self, borrower: &BorrowerRecord) -> Result<(), StorageError>;

    /// Persist a consent grant keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn save_consent(&self, consent: &Consent) -> Result<(), StorageError>;

    /// Fetch a consent grant. Returns `Ok(None)` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn get_consent(&self, id: &str) -> Result<Option<Consent>, StorageError>;

    /// Upsert the credential record for its borrower reference.
    ///
    /// One record exists per borrower; saving overwrites the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn save_credential(&self, record: &CredentialRecord) -> Result<(), StorageError>;

    /// Fetch the credential record for a borrower. Returns `Ok(None)` if the
    /// borrower has never been issued a credential.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn get_credential(
        &self,
        borrower_reference: &str,
    ) -> Result<Option<CredentialRecord>, StorageError>;

    /// Mark the borrower's credential as revoked. Revocation is one-way.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if no credential exists for the borrower.
    /// - [`StorageError::Write`] if the underlying backend fails.
    async fn revoke_credential(&self, borrower_reference: &str) -> Result<(), StorageError>;
}
