//! The credit-readiness verifiable credential document.
//!
//! Shaped after the W3C VC data model: fixed `@context` and `type` lists, a
//! DID-like issuer, issuance and expiration dates, and a flat subject.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single `@context` entry of every credential.
pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// The `type` list of every credential.
pub const VC_TYPES: [&str; 2] = ["VerifiableCredential", "CreditReadinessCredential"];

/// Credentials are valid for a fixed window after issuance.
pub const VALIDITY_DAYS: i64 = 365;

/// Claims about a borrower's enterprise.
///
/// Fields missing from an incoming document take their zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditReadinessSubject {
    pub enterprise_exists: bool,
    pub months_active: u32,
    pub validation_source: String,
    pub sector: String,
    pub district: String,
}

/// A complete credit-readiness credential, before encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReadinessCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: String,
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DateTime<Utc>,
    #[serde(rename = "expirationDate")]
    pub expiration_date: DateTime<Utc>,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CreditReadinessSubject,
}

impl CreditReadinessCredential {
    /// Build a credential issued at `issued_at`, expiring
    /// [`VALIDITY_DAYS`] later.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: CreditReadinessSubject,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            context: vec![VC_CONTEXT.to_owned()],
            types: VC_TYPES.iter().map(|t| (*t).to_owned()).collect(),
            issuer: issuer.into(),
            issuance_date: issued_at,
            expiration_date: issued_at + Duration::days(VALIDITY_DAYS),
            credential_subject: subject,
        }
    }

    /// Serialize to the JSON bytes that get hashed and encrypted.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn subject() -> CreditReadinessSubject {
        CreditReadinessSubject {
            enterprise_exists: true,
            months_active: 14,
            validation_source: "udyam".to_owned(),
            sector: "Handicrafts".to_owned(),
            district: "Shopian".to_owned(),
        }
    }

    #[test]
    fn new_fixes_context_types_and_window() {
        let issued = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let vc = CreditReadinessCredential::new("did:test", subject(), issued);
        assert_eq!(vc.context, vec![VC_CONTEXT]);
        assert_eq!(vc.types, vec!["VerifiableCredential", "CreditReadinessCredential"]);
        assert_eq!(
            vc.expiration_date,
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn payload_uses_vc_field_names() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let vc = CreditReadinessCredential::new("did:test", subject(), issued);
        let value: serde_json::Value = serde_json::from_slice(&vc.to_payload().unwrap()).unwrap();
        assert_eq!(value["@context"], json!([VC_CONTEXT]));
        assert_eq!(value["issuer"], "did:test");
        assert_eq!(value["issuanceDate"], "2026-03-04T05:06:07Z");
        assert_eq!(value["credentialSubject"]["months_active"], 14);
        assert_eq!(value["credentialSubject"]["enterprise_exists"], true);
    }

    #[test]
    fn subject_tolerates_missing_fields() {
        let subject: CreditReadinessSubject =
            serde_json::from_value(json!({"months_active": 3})).unwrap();
        assert_eq!(subject.months_active, 3);
        assert!(!subject.enterprise_exists);
        assert!(subject.validation_source.is_empty());
    }

    #[test]
    fn subject_rejects_negative_months() {
        let result: Result<CreditReadinessSubject, _> =
            serde_json::from_value(json!({"months_active": -1}));
        assert!(result.is_err());
    }
}
