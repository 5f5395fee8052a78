//! Records persisted by the storage layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string written on every freshly created consent.
pub const CONSENT_STATUS_ACTIVE: &str = "active";

/// Identity anchor for a borrower. Provisioned once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerRecord {
    /// Stable, unique borrower reference (e.g. `ref-001`).
    pub reference: String,
    pub district: String,
    pub sector: String,
}

impl BorrowerRecord {
    /// Whether this borrower passes the discovery filters. Empty filters
    /// match everything.
    #[must_use]
    pub fn matches(&self, district: &str, sector: &str) -> bool {
        (district.is_empty() || self.district == district)
            && (sector.is_empty() || self.sector == sector)
    }
}

/// A time-boxed, scope-bound grant letting one lender read one borrower's
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    pub id: String,
    pub borrower_reference: String,
    /// Lender identity declared when the grant was requested.
    pub lender_id: String,
    pub scope: Vec<String>,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assisted_by: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
}

/// An at-rest credential: the serialized VC sealed by the envelope cipher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub borrower_reference: String,
    /// `nonce || ciphertext || tag`.
    pub encrypted_vc: Vec<u8>,
    /// Hex SHA-256 of the plaintext VC, fixed at issuance.
    pub hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    /// Provenance annotations (e.g. `issuer`). Not used for authorization.
    pub registry_notes: BTreeMap<String, String>,
}
