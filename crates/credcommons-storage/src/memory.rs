//! In-memory storage backend.
//!
//! Each table sits behind its own `RwLock`, so discovery reads never wait on
//! a credential write and vice versa. Nothing is persisted; all data is lost
//! when the process exits.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{BorrowerRecord, CommonsStore, Consent, CredentialRecord, StorageError};

/// In-memory tables for borrowers, consents, and credentials.
///
/// Cloning shares the underlying tables.
///
/// # Examples
///
/// ```
/// # use credcommons_storage::{BorrowerRecord, CommonsStore, MemoryStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::with_borrowers(vec![BorrowerRecord {
///     reference: "ref-001".to_owned(),
///     district: "Shopian".to_owned(),
///     sector: "Handicrafts".to_owned(),
/// }]);
/// let found = store.list_borrowers("Shopian", "", 10).await.unwrap();
/// assert_eq!(found.len(), 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    borrowers: Arc<RwLock<Vec<BorrowerRecord>>>,
    consents: Arc<RwLock<HashMap<String, Consent>>>,
    credentials: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl MemoryStore {
    /// Create a store with empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with borrowers, kept in the given order.
    #[must_use]
    pub fn with_borrowers(borrowers: Vec<BorrowerRecord>) -> Self {
        Self {
            borrowers: Arc::new(RwLock::new(borrowers)),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl CommonsStore for MemoryStore {
    async fn list_borrowers(
        &self,
        district: &str,
        sector: &str,
        limit: usize,
    ) -> Result<Vec<BorrowerRecord>, StorageError> {
        let borrowers = self.borrowers.read().await;
        Ok(borrowers
            .iter()
            .filter(|b| b.matches(district, sector))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save_borrower(&self, borrower: &BorrowerRecord) -> Result<(), StorageError> {
        let mut borrowers = self.borrowers.write().await;
        match borrowers
            .iter_mut()
            .find(|b| b.reference == borrower.reference)
        {
            Some(existing) => *existing = borrower.clone(),
            None => borrowers.push(borrower.clone()),
        }
        Ok(())
    }

    async fn save_consent(&self, consent: &Consent) -> Result<(), StorageError> {
        let mut consents = self.consents.write().await;
        consents.insert(consent.id.clone(), consent.clone());
        Ok(())
    }

    async fn get_consent(&self, id: &str) -> Result<Option<Consent>, StorageError> {
        let consents = self.consents.read().await;
        Ok(consents.get(id).cloned())
    }

    async fn save_credential(&self, record: &CredentialRecord) -> Result<(), StorageError> {
        let mut credentials = self.credentials.write().await;
        credentials.insert(record.borrower_reference.clone(), record.clone());
        Ok(())
    }

    async fn get_credential(
        &self,
        borrower_reference: &str,
    ) -> Result<Option<CredentialRecord>, StorageError> {
        let credentials = self.credentials.read().await;
        Ok(credentials.get(borrower_reference).cloned())
    }

    async fn revoke_credential(&self, borrower_reference: &str) -> Result<(), StorageError> {
        let mut credentials = self.credentials.write().await;
        let record =
            credentials
                .get_mut(borrower_reference)
                .ok_or_else(|| StorageError::NotFound {
                    table: "credentials",
                    key: borrower_reference.to_owned(),
                })?;
        record.revoked = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::CONSENT_STATUS_ACTIVE;

    fn borrower(reference: &str, district: &str, sector: &str) -> BorrowerRecord {
        BorrowerRecord {
            reference: reference.to_owned(),
            district: district.to_owned(),
            sector: sector.to_owned(),
        }
    }

    fn seeded() -> MemoryStore {
        MemoryStore::with_borrowers(vec![
            borrower("ref-001", "Shopian", "Handicrafts"),
            borrower("ref-002", "Anantnag", "Agriculture"),
            borrower("ref-003", "Shopian", "Agriculture"),
            borrower("ref-004", "Shopian", "Handicrafts"),
        ])
    }

    fn credential(reference: &str, hash: &str) -> CredentialRecord {
        let now = Utc::now();
        CredentialRecord {
            borrower_reference: reference.to_owned(),
            encrypted_vc: vec![1, 2, 3],
            hash: hash.to_owned(),
            issued_at: now,
            expires_at: now + Duration::days(365),
            revoked: false,
            registry_notes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn list_without_filters_returns_all_in_order() {
        let store = seeded();
        let refs: Vec<_> = store
            .list_borrowers("", "", 100)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.reference)
            .collect();
        assert_eq!(refs, vec!["ref-001", "ref-002", "ref-003", "ref-004"]);
    }

    #[tokio::test]
    async fn list_filters_by_district() {
        let store = seeded();
        let found = store.list_borrowers("Shopian", "", 100).await.unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|b| b.district == "Shopian"));
    }

    #[tokio::test]
    async fn list_filters_by_district_and_sector() {
        let store = seeded();
        let found = store
            .list_borrowers("Shopian", "Agriculture", 100)
            .await
            .unwrap();
        assert_eq!(found, vec![borrower("ref-003", "Shopian", "Agriculture")]);
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let store = seeded();
        let found = store.list_borrowers("Shopian", "", 2).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].reference, "ref-001");
        assert_eq!(found[1].reference, "ref-003");
    }

    #[tokio::test]
    async fn list_with_zero_limit_is_empty() {
        let store = seeded();
        assert!(store.list_borrowers("", "", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_borrower_replaces_by_reference() {
        let store = seeded();
        store
            .save_borrower(&borrower("ref-002", "Kupwara", "Dairy"))
            .await
            .unwrap();
        let found = store.list_borrowers("Kupwara", "", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.list_borrowers("", "", 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn consent_roundtrip_and_missing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let consent = Consent {
            id: "consent-abc".to_owned(),
            borrower_reference: "ref-001".to_owned(),
            lender_id: "lender-a".to_owned(),
            scope: vec!["credit_score".to_owned()],
            purpose: "loan_eval".to_owned(),
            assisted_by: None,
            issued_at: now,
            expires_at: now + Duration::days(30),
            status: CONSENT_STATUS_ACTIVE.to_owned(),
        };
        store.save_consent(&consent).await.unwrap();
        assert_eq!(
            store.get_consent("consent-abc").await.unwrap(),
            Some(consent)
        );
        assert_eq!(store.get_consent("consent-zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_credential_overwrites_previous() {
        let store = MemoryStore::new();
        store.save_credential(&credential("ref-001", "aa")).await.unwrap();
        store.save_credential(&credential("ref-001", "bb")).await.unwrap();
        let record = store.get_credential("ref-001").await.unwrap().unwrap();
        assert_eq!(record.hash, "bb");
    }

    #[tokio::test]
    async fn revoke_sets_flag() {
        let store = MemoryStore::new();
        store.save_credential(&credential("ref-001", "aa")).await.unwrap();
        store.revoke_credential("ref-001").await.unwrap();
        assert!(store.get_credential("ref-001").await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn revoke_missing_is_not_found() {
        let store = MemoryStore::new();
        let result = store.revoke_credential("ref-404").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn clone_shares_tables() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.save_credential(&credential("ref-001", "aa")).await.unwrap();
        assert!(clone.get_credential("ref-001").await.unwrap().is_some());
    }
}
