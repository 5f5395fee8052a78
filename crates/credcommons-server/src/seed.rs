//! Borrower directory seeding.
//!
//! Borrowers are reference data provisioned outside the request path. At
//! startup they are loaded from `BORROWER_SEED_FILE` (a JSON array of
//! `{reference, district, sector}` objects) or, if no file is configured and
//! the directory is empty, from a small built-in demo set.

use std::path::Path;

use anyhow::Context;
use credcommons_storage::{BorrowerRecord, CommonsStore};
use tracing::info;

/// The demo borrowers used when no seed file is configured.
#[must_use]
pub fn demo_borrowers() -> Vec<BorrowerRecord> {
    [
        ("ref-001", "Shopian", "Handicrafts"),
        ("ref-002", "Anantnag", "Agriculture"),
    ]
    .into_iter()
    .map(|(reference, district, sector)| BorrowerRecord {
        reference: reference.to_owned(),
        district: district.to_owned(),
        sector: sector.to_owned(),
    })
    .collect()
}

/// Read borrower records from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// borrower records.
pub async fn load_seed_file(path: &Path) -> anyhow::Result<Vec<BorrowerRecord>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("seed file '{}' is not a borrower array", path.display()))
}

/// Populate the borrower directory.
///
/// A seed file is always applied (records upsert by reference). The demo set
/// is only written into an empty directory.
///
/// # Errors
///
/// Returns an error if the seed file is unusable or the store rejects a write.
pub async fn seed_borrowers(
    store: &dyn CommonsStore,
    seed_file: Option<&Path>,
) -> anyhow::Result<usize> {
    let borrowers = if let Some(path) = seed_file {
        load_seed_file(path).await?
    } else if store
        .list_borrowers("", "", 1)
        .await
        .context("failed to inspect borrower directory")?
        .is_empty()
    {
        demo_borrowers()
    } else {
        return Ok(0);
    };

    for borrower in &borrowers {
        store
            .save_borrower(borrower)
            .await
            .with_context(|| format!("failed to seed borrower '{}'", borrower.reference))?;
    }
    info!(count = borrowers.len(), "borrower directory seeded");
    Ok(borrowers.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use credcommons_storage::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn empty_store_gets_demo_set() {
        let store = MemoryStore::new();
        assert_eq!(seed_borrowers(&store, None).await.unwrap(), 2);
        let shopian = store.list_borrowers("Shopian", "", 10).await.unwrap();
        assert_eq!(shopian.len(), 1);
        assert_eq!(shopian[0].reference, "ref-001");
    }

    #[tokio::test]
    async fn populated_store_is_left_alone() {
        let store = MemoryStore::with_borrowers(vec![BorrowerRecord {
            reference: "ref-900".to_owned(),
            district: "Kupwara".to_owned(),
            sector: "Dairy".to_owned(),
        }]);
        assert_eq!(seed_borrowers(&store, None).await.unwrap(), 0);
        assert_eq!(store.list_borrowers("", "", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seed_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("borrowers.json");
        tokio::fs::write(
            &path,
            r#"[{"reference":"ref-100","district":"Baramulla","sector":"Tourism"}]"#,
        )
        .await
        .unwrap();

        let store = MemoryStore::new();
        assert_eq!(seed_borrowers(&store, Some(&path)).await.unwrap(), 1);
        let found = store.list_borrowers("Baramulla", "", 10).await.unwrap();
        assert_eq!(found[0].sector, "Tourism");
    }

    #[tokio::test]
    async fn malformed_seed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("borrowers.json");
        tokio::fs::write(&path, r#"{"reference":"ref-100"}"#).await.unwrap();

        let store = MemoryStore::new();
        assert!(seed_borrowers(&store, Some(&path)).await.is_err());
        assert!(
            seed_borrowers(&store, Some(&dir.path().join("missing.json")))
                .await
                .is_err()
        );
    }
}
