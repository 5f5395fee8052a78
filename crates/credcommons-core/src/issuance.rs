//! Credential issuance pipeline.
//!
//! `issue` stamps a credit-readiness credential, seals it with the envelope
//! key, fingerprints the plaintext, and stores the result as the borrower's
//! only credential. Each step fails fast; nothing is retried. A store
//! failure leaves whatever record existed before untouched because every
//! save is a single atomic replacement.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use credcommons_storage::{CommonsStore, CredentialRecord, StorageError};
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::crypto::{self, EnvelopeKey};
use crate::error::IssuanceError;
use crate::registry::hash_credential;
use crate::vc::{CreditReadinessCredential, CreditReadinessSubject};

/// Registry note key recording who issued a credential.
pub const ISSUER_NOTE: &str = "issuer";

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// Hex SHA-256 of the plaintext credential payload.
    pub hash: String,
    /// The record as persisted.
    pub record: CredentialRecord,
}

/// Builds, encrypts, and stores credentials on behalf of one issuer.
pub struct IssuancePipeline {
    store: Arc<dyn CommonsStore>,
    key: EnvelopeKey,
    issuer: String,
    audit: Arc<AuditTrail>,
}

impl IssuancePipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn CommonsStore>,
        key: EnvelopeKey,
        issuer: impl Into<String>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            store,
            key,
            issuer: issuer.into(),
            audit,
        }
    }

    /// The issuer identity stamped into every credential.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a credential for `borrower_reference`, replacing any earlier one.
    ///
    /// `actor` is recorded in the audit trail only.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::Validation`] if `borrower_reference` is empty.
    /// - [`IssuanceError::Marshal`] if the document cannot be serialized.
    /// - [`IssuanceError::Encrypt`] if sealing fails.
    /// - [`IssuanceError::Storage`] if persisting fails.
    pub async fn issue(
        &self,
        subject: CreditReadinessSubject,
        borrower_reference: &str,
        actor: &str,
    ) -> Result<IssuedCredential, IssuanceError> {
        self.issue_at(subject, borrower_reference, actor, Utc::now())
            .await
    }

    /// [`issue`](Self::issue) with an explicit issuance instant.
    ///
    /// # Errors
    ///
    /// See [`issue`](Self::issue).
    pub async fn issue_at(
        &self,
        subject: CreditReadinessSubject,
        borrower_reference: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, IssuanceError> {
        if borrower_reference.is_empty() {
            return Err(IssuanceError::Validation {
                reason: "borrower_reference is required".to_owned(),
            });
        }

        let credential = CreditReadinessCredential::new(self.issuer.clone(), subject, now);
        let payload = credential
            .to_payload()
            .map_err(|e| IssuanceError::Marshal {
                reason: e.to_string(),
            })?;
        let encrypted_vc = crypto::encrypt(&self.key, &payload).map_err(IssuanceError::Encrypt)?;
        let hash = hash_credential(&payload);

        let record = CredentialRecord {
            borrower_reference: borrower_reference.to_owned(),
            encrypted_vc,
            hash: hash.clone(),
            issued_at: credential.issuance_date,
            expires_at: credential.expiration_date,
            revoked: false,
            registry_notes: BTreeMap::from([(ISSUER_NOTE.to_owned(), self.issuer.clone())]),
        };
        self.store
            .save_credential(&record)
            .await
            .map_err(IssuanceError::Storage)?;

        info!(borrower_reference, hash = %hash, "credential issued");
        self.audit
            .record(
                AuditEvent::now("credential_issued", actor)
                    .with("borrower_reference", borrower_reference)
                    .with("hash", hash.clone()),
            )
            .await;

        Ok(IssuedCredential { hash, record })
    }

    /// Mark the borrower's credential revoked. Revocation is permanent until
    /// the credential is reissued.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::NotFound`] if no credential exists for the borrower.
    /// - [`IssuanceError::Storage`] if the backend fails.
    pub async fn revoke(&self, borrower_reference: &str, actor: &str) -> Result<(), IssuanceError> {
        if borrower_reference.is_empty() {
            return Err(IssuanceError::Validation {
                reason: "borrower_reference is required".to_owned(),
            });
        }

        match self.store.revoke_credential(borrower_reference).await {
            Ok(()) => {}
            Err(StorageError::NotFound { .. }) => {
                return Err(IssuanceError::NotFound {
                    borrower_reference: borrower_reference.to_owned(),
                });
            }
            Err(e) => return Err(IssuanceError::Storage(e)),
        }

        info!(borrower_reference, "credential revoked");
        self.audit
            .record(
                AuditEvent::now("credential_revoked", actor)
                    .with("borrower_reference", borrower_reference),
            )
            .await;
        Ok(())
    }
}

impl std::fmt::Debug for IssuancePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuancePipeline")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
