//! Borrower discovery.
//!
//! Lenders browse the borrower directory by district and sector. Results
//! carry only the public reference data; no credential content is touched.

use std::sync::Arc;

use credcommons_storage::{BorrowerRecord, CommonsStore, StorageError};

use crate::audit::{AuditEvent, AuditTrail};

/// Default cap on discovery results.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Filtered, capped view of the borrower table.
pub struct Directory {
    store: Arc<dyn CommonsStore>,
    audit: Arc<AuditTrail>,
    page_limit: usize,
}

impl Directory {
    #[must_use]
    pub fn new(store: Arc<dyn CommonsStore>, audit: Arc<AuditTrail>, page_limit: usize) -> Self {
        Self {
            store,
            audit,
            page_limit,
        }
    }

    /// Maximum number of results a search returns.
    #[must_use]
    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    /// List borrowers matching `district` and `sector`; an empty filter
    /// matches everything.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the lookup fails.
    pub async fn search(
        &self,
        district: &str,
        sector: &str,
        actor: &str,
    ) -> Result<Vec<BorrowerRecord>, StorageError> {
        let results = self
            .store
            .list_borrowers(district, sector, self.page_limit)
            .await?;

        self.audit
            .record(
                AuditEvent::now("discovery", actor)
                    .with("district", district)
                    .with("sector", sector),
            )
            .await;
        Ok(results)
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("page_limit", &self.page_limit)
            .finish_non_exhaustive()
    }
}
