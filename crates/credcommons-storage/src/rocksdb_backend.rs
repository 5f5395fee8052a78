//! `RocksDB` storage backend.
//!
//! One column family per table, records encoded as JSON. All calls are
//! dispatched to the Tokio blocking pool since `RocksDB` is a synchronous
//! C++ library.
//!
//! Borrowers are keyed by reference, so listings come back in reference
//! order regardless of the order they were provisioned in.
//!
//! Single-record writes are atomic in `RocksDB`. Revocation is a
//! read-modify-write, so it and credential saves share a mutex; without it a
//! revoke racing a reissue could write back the stale record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, DBWithThreadMode, IteratorMode, MultiThreaded, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::{BorrowerRecord, CommonsStore, Consent, CredentialRecord, StorageError};

type Db = DBWithThreadMode<MultiThreaded>;

const BORROWERS: &str = "borrowers";
const CONSENTS: &str = "consents";
const CREDENTIALS: &str = "credentials";

/// A [`CommonsStore`] backed by `RocksDB`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<Db>,
    path: PathBuf,
    credential_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for RocksDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RocksDbStore {
    /// Open (or create) a database at `path` with all three tables.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if `RocksDB` fails to open the database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = Db::open_cf(&opts, path, [BORROWERS, CONSENTS, CREDENTIALS]).map_err(|e| {
            StorageError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
            credential_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Db) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StorageError::Read {
                table: "rocksdb",
                key: String::new(),
                reason: format!("blocking task panicked: {e}"),
            })?
    }

    async fn put<T: Serialize>(
        &self,
        table: &'static str,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let bytes = encode(table, value)?;
        let key = key.to_owned();
        self.blocking(move |db| {
            let cf = column(db, table)?;
            db.put_cf(&cf, key.as_bytes(), bytes)
                .map_err(|e| StorageError::Write {
                    table,
                    key,
                    reason: e.to_string(),
                })
        })
        .await
    }

    async fn get<T: DeserializeOwned + Send + 'static>(
        &self,
        table: &'static str,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let key = key.to_owned();
        self.blocking(move |db| read(db, table, &key)).await
    }
}

fn column<'a>(db: &'a Db, name: &str) -> Result<Arc<BoundColumnFamily<'a>>, StorageError> {
    db.cf_handle(name).ok_or_else(|| StorageError::MissingTable {
        name: name.to_owned(),
    })
}

fn encode<T: Serialize>(table: &'static str, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Codec {
        table,
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(table: &'static str, bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Codec {
        table,
        reason: e.to_string(),
    })
}

fn read<T: DeserializeOwned>(
    db: &Db,
    table: &'static str,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let cf = column(db, table)?;
    let bytes = db
        .get_cf(&cf, key.as_bytes())
        .map_err(|e| StorageError::Read {
            table,
            key: key.to_owned(),
            reason: e.to_string(),
        })?;
    bytes.map(|b| decode(table, &b)).transpose()
}

#[async_trait::async_trait]
impl CommonsStore for RocksDbStore {
    async fn list_borrowers(
        &self,
        district: &str,
        sector: &str,
        limit: usize,
    ) -> Result<Vec<BorrowerRecord>, StorageError> {
        let district = district.to_owned();
        let sector = sector.to_owned();
        self.blocking(move |db| {
            let cf = column(db, BORROWERS)?;
            let mut results = Vec::new();
            for item in db.iterator_cf(&cf, IteratorMode::Start) {
                if results.len() >= limit {
                    break;
                }
                let (_, value) = item.map_err(|e| StorageError::Read {
                    table: BORROWERS,
                    key: String::new(),
                    reason: e.to_string(),
                })?;
                let borrower: BorrowerRecord = decode(BORROWERS, &value)?;
                if borrower.matches(&district, &sector) {
                    results.push(borrower);
                }
            }
            Ok(results)
        })
        .await
    }

    async fn save_borrower(&self, borrower: &BorrowerRecord) -> Result<(), StorageError> {
        self.put(BORROWERS, &borrower.reference, borrower).await
    }

    async fn save_consent(&self, consent: &Consent) -> Result<(), StorageError> {
        self.put(CONSENTS, &consent.id, consent).await
    }

    async fn get_consent(&self, id: &str) -> Result<Option<Consent>, StorageError> {
        self.get(CONSENTS, id).await
    }

    async fn save_credential(&self, record: &CredentialRecord) -> Result<(), StorageError> {
        let _guard = self.credential_lock.lock().await;
        self.put(CREDENTIALS, &record.borrower_reference, record).await
    }

    async fn get_credential(
        &self,
        borrower_reference: &str,
    ) -> Result<Option<CredentialRecord>, StorageError> {
        self.get(CREDENTIALS, borrower_reference).await
    }

    async fn revoke_credential(&self, borrower_reference: &str) -> Result<(), StorageError> {
        let _guard = self.credential_lock.lock().await;
        let mut record: CredentialRecord = self
            .get(CREDENTIALS, borrower_reference)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                table: CREDENTIALS,
                key: borrower_reference.to_owned(),
            })?;
        record.revoked = true;
        self.put(CREDENTIALS, borrower_reference, &record).await
    }
}
