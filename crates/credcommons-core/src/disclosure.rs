//! Disclosure orchestrator.
//!
//! Validates a consent, opens the borrower's stored credential, and returns
//! it as a signed presentation. Every call decrypts and signs afresh; no
//! plaintext or token outlives the request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use credcommons_storage::CommonsStore;
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::consent::ConsentManager;
use crate::crypto::{self, EnvelopeKey};
use crate::error::DisclosureError;
use crate::presentation::PresentationSigner;

/// Produces signed credential presentations for consented lenders.
pub struct DisclosureService {
    consents: Arc<ConsentManager>,
    store: Arc<dyn CommonsStore>,
    key: EnvelopeKey,
    signer: PresentationSigner,
    audit: Arc<AuditTrail>,
}

impl DisclosureService {
    #[must_use]
    pub fn new(
        consents: Arc<ConsentManager>,
        store: Arc<dyn CommonsStore>,
        key: EnvelopeKey,
        signer: PresentationSigner,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            consents,
            store,
            key,
            signer,
            audit,
        }
    }

    /// The signer used for presentations.
    #[must_use]
    pub fn signer(&self) -> &PresentationSigner {
        &self.signer
    }

    /// Disclose the credential covered by `consent_id` to `requesting_actor`.
    ///
    /// # Errors
    ///
    /// - [`DisclosureError::Consent`] if the consent is missing, inactive, or
    ///   bound to another lender.
    /// - [`DisclosureError::CredentialNotFound`] if nothing was ever issued.
    /// - [`DisclosureError::Gone`] if the credential is revoked or expired.
    /// - [`DisclosureError::Decrypt`], [`DisclosureError::Decode`], or
    ///   [`DisclosureError::Sign`] on internal faults.
    /// - [`DisclosureError::Storage`] if the credential lookup fails.
    pub async fn disclose(
        &self,
        consent_id: &str,
        requesting_actor: &str,
    ) -> Result<String, DisclosureError> {
        self.disclose_at(consent_id, requesting_actor, Utc::now())
            .await
    }

    /// [`disclose`](Self::disclose) at an explicit instant.
    ///
    /// # Errors
    ///
    /// See [`disclose`](Self::disclose).
    pub async fn disclose_at(
        &self,
        consent_id: &str,
        requesting_actor: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DisclosureError> {
        let consent = self
            .consents
            .validate_at(consent_id, requesting_actor, now)
            .await?;
        let borrower_reference = consent.borrower_reference.as_str();

        let record = self
            .store
            .get_credential(borrower_reference)
            .await
            .map_err(DisclosureError::Storage)?
            .ok_or_else(|| DisclosureError::CredentialNotFound {
                borrower_reference: borrower_reference.to_owned(),
            })?;

        if record.revoked || now > record.expires_at {
            return Err(DisclosureError::Gone {
                borrower_reference: borrower_reference.to_owned(),
            });
        }

        let plaintext =
            crypto::decrypt(&self.key, &record.encrypted_vc).map_err(DisclosureError::Decrypt)?;
        let vc: serde_json::Value =
            serde_json::from_slice(&plaintext).map_err(|e| DisclosureError::Decode {
                reason: e.to_string(),
            })?;
        drop(plaintext);

        let token = self.signer.sign(&vc).map_err(DisclosureError::Sign)?;

        info!(consent_id, borrower_reference, "credential disclosed");
        self.audit
            .record(
                AuditEvent::now("credential_retrieved", &consent.lender_id)
                    .with("consent_id", consent_id)
                    .with("borrower_reference", borrower_reference),
            )
            .await;

        Ok(token)
    }
}

impl std::fmt::Debug for DisclosureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisclosureService")
            .field("issuer", &self.signer.issuer())
            .finish_non_exhaustive()
    }
}
