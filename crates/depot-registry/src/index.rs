//! Durable metadata index backed by redb.
//!
//! All records live in a single `artifacts` table as JSON values keyed
//! by artifact id. Writes are synchronous (write txn + commit). Reads
//! are served from an in-memory mirror that is rebuilt from the
//! durable store at open time; the durable store is never read again
//! after that.

use crate::blob::blob_path;
use crate::error::{Error, Result};
use depot_common::ArtifactRecord;
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::path::Path;
use tracing::error;

const ARTIFACTS: TableDefinition<&str, &[u8]> = TableDefinition::new("artifacts");

const INDEX_FILE: &str = "registry.redb";

/// Key→record store with a read-through in-memory mirror.
///
/// The mirror is owned here and protected by a reader/writer lock;
/// there is no process-wide shared state. `put` holds the write lock
/// only for the map mutation, never across the durable commit.
pub struct MetadataIndex {
    db: Database,
    records: RwLock<HashMap<String, ArtifactRecord>>,
}

impl MetadataIndex {
    /// Open (or create) the index under `root` and load every durable
    /// record into the mirror.
    ///
    /// Fails with [`Error::IndexOpen`] if the database cannot be
    /// opened, e.g. locked by another process. This is fatal to the
    /// service; no request may be served without a loaded mirror.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| Error::IndexOpen(e.to_string()))?;

        let db = Database::create(root.join(INDEX_FILE))
            .map_err(|e| Error::IndexOpen(e.to_string()))?;

        // Create the table eagerly so the load below and later read
        // txns cannot fail on a missing table.
        let write_txn = db.begin_write().map_err(|e| Error::IndexOpen(e.to_string()))?;
        {
            let _t = write_txn
                .open_table(ARTIFACTS)
                .map_err(|e| Error::IndexOpen(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::IndexOpen(e.to_string()))?;

        let records = Self::load(&db, root)?;
        Ok(Self {
            db,
            records: RwLock::new(records),
        })
    }

    fn load(db: &Database, root: &Path) -> Result<HashMap<String, ArtifactRecord>> {
        let read_txn = db.begin_read().map_err(|e| Error::IndexOpen(e.to_string()))?;
        let table = read_txn
            .open_table(ARTIFACTS)
            .map_err(|e| Error::IndexOpen(e.to_string()))?;

        let mut records = HashMap::new();
        for entry in table.iter().map_err(|e| Error::IndexOpen(e.to_string()))? {
            let entry = entry.map_err(|e| Error::IndexOpen(e.to_string()))?;
            let id = entry.0.value().to_string();
            match serde_json::from_slice::<ArtifactRecord>(entry.1.value()) {
                Ok(mut record) => {
                    // storage_path is never persisted; rebuild it.
                    record.storage_path = blob_path(root, &id);
                    records.insert(id, record);
                }
                Err(e) => error!("Failed to decode artifact record '{}': {}", id, e),
            }
        }
        Ok(records)
    }

    /// Insert a record into the mirror, then commit it durably.
    ///
    /// If the durable commit fails the mirror entry is left in place:
    /// it may already have been observed by concurrent readers, and a
    /// rollback of a visible read is not attempted. A restart would
    /// not reproduce such a record.
    pub fn put(&self, record: &ArtifactRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record).map_err(|e| Error::IndexWrite {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;

        {
            let mut records = self.records.write();
            records.insert(record.id.clone(), record.clone());
        }

        self.commit(&record.id, &bytes)
    }

    fn commit(&self, id: &str, bytes: &[u8]) -> Result<()> {
        let index_write = |e: &dyn std::fmt::Display| Error::IndexWrite {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let write_txn = self.db.begin_write().map_err(|e| index_write(&e))?;
        {
            let mut table = write_txn.open_table(ARTIFACTS).map_err(|e| index_write(&e))?;
            table.insert(id, bytes).map_err(|e| index_write(&e))?;
        }
        write_txn.commit().map_err(|e| index_write(&e))?;
        Ok(())
    }

    /// Mirror lookup. The durable store is not consulted.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ArtifactRecord> {
        self.records.read().get(id).cloned()
    }

    /// All records, optionally restricted to one owner. Order is
    /// unspecified.
    #[must_use]
    pub fn list(&self, owner: Option<&str>) -> Vec<ArtifactRecord> {
        self.records
            .read()
            .values()
            .filter(|r| owner.is_none_or(|o| r.owner == o))
            .cloned()
            .collect()
    }

    /// Release the durable store. Safe to call exactly once; consuming
    /// the index makes double-close unrepresentable.
    pub fn close(self) {
        drop(self.db);
    }
}
