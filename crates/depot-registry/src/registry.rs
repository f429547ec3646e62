//! Registry facade.
//!
//! Orchestrates the upload and read workflows over the blob store and
//! the metadata index. Every operation is synchronous and may block on
//! disk I/O; concurrency comes from the hosting HTTP layer's workers.

use crate::blob::{blob_path, write_blob};
use crate::error::{Error, Result};
use crate::id::generate_id;
use crate::index::MetadataIndex;
use chrono::{Local, Utc};
use depot_common::ArtifactRecord;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Artifact registry: blob files plus a durable metadata index under
/// one root directory.
pub struct Registry {
    root: PathBuf,
    index: MetadataIndex,
}

impl Registry {
    /// Open the registry rooted at `root`, creating it if absent.
    /// Every durable record is loaded before any request is served.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let index = MetadataIndex::open(&root)?;
        info!("Registry opened at {}", root.display());
        Ok(Self { root, index })
    }

    /// Store an uploaded artifact and commit its metadata record.
    ///
    /// Validation runs before any storage side effect. The blob write
    /// and the metadata commit are two separate backends with no
    /// spanning transaction: a commit failure after a successful blob
    /// write leaves an orphaned blob file, which is logged and
    /// surfaced but not repaired here.
    pub fn save(
        &self,
        owner: &str,
        name: &str,
        version: &str,
        reader: impl Read,
        original_filename: &str,
    ) -> Result<ArtifactRecord> {
        if owner.is_empty() {
            return Err(Error::OwnerRequired);
        }

        let id = generate_id()?;
        let name = if name.is_empty() { original_filename } else { name };
        let version = if version.is_empty() {
            Local::now().format("%Y%m%d-%H%M%S").to_string()
        } else {
            version.to_string()
        };

        let (sha256, size) = match write_blob(&self.root, &id, reader) {
            Ok(written) => written,
            Err(e) => {
                if matches!(e, Error::BlobWrite { .. }) {
                    // Best-effort removal of the partial file.
                    let _ = std::fs::remove_file(blob_path(&self.root, &id));
                }
                return Err(e);
            }
        };

        let record = ArtifactRecord {
            id: id.clone(),
            owner: owner.to_string(),
            name: name.to_string(),
            version,
            sha256,
            size,
            storage_path: blob_path(&self.root, &id),
            uploaded_at: Utc::now(),
        };

        if let Err(e) = self.index.put(&record) {
            error!("Orphaned blob '{}': metadata commit failed: {}", id, e);
            return Err(e);
        }
        Ok(record)
    }

    /// Look up one record. `None` is a valid negative result, not an
    /// error.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ArtifactRecord> {
        self.index.get(id)
    }

    /// All records, optionally restricted to one owner.
    #[must_use]
    pub fn list(&self, owner: Option<&str>) -> Vec<ArtifactRecord> {
        self.index.list(owner)
    }

    /// Open the blob for `id` for streaming read.
    ///
    /// Returns `Ok(None)` for an unknown id. A present record whose
    /// blob file is gone (external tampering, disk loss) fails with
    /// [`Error::BlobMissing`].
    pub fn open_blob(&self, id: &str) -> Result<Option<(ArtifactRecord, File)>> {
        let Some(record) = self.index.get(id) else {
            return Ok(None);
        };
        let file = File::open(&record.storage_path).map_err(|e| Error::BlobMissing {
            id: id.to_string(),
            source: e,
        })?;
        Ok(Some((record, file)))
    }

    /// Registry root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Release the underlying index.
    pub fn close(self) {
        self.index.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_common::checksum::sha256_hex;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn timestampish(version: &str) -> bool {
        version.len() == 15
            && version.as_bytes()[8] == b'-'
            && version
                .bytes()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_digit())
    }

    #[test]
    fn test_save_scenario() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        let payload = b"0123456789";

        let rec = registry
            .save("u1", "calc", "", Cursor::new(payload), "calc-1.0.pkg")
            .unwrap();

        assert_eq!(rec.owner, "u1");
        assert_eq!(rec.name, "calc");
        assert!(timestampish(&rec.version), "version: {}", rec.version);
        assert_eq!(rec.size, 10);
        assert_eq!(rec.sha256, sha256_hex(payload));

        let (_, mut blob) = registry.open_blob(&rec.id).unwrap().unwrap();
        let mut bytes = Vec::new();
        blob.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, payload);
    }

    #[test]
    fn test_defaults_name_to_filename() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();

        let rec = registry
            .save("u1", "", "2.0", Cursor::new(b"x".as_slice()), "upload.pkg")
            .unwrap();
        assert_eq!(rec.name, "upload.pkg");
        assert_eq!(rec.version, "2.0");
    }

    #[test]
    fn test_identical_uploads_get_distinct_ids() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        let payload = b"same bytes";

        let a = registry
            .save("u1", "pkg", "1", Cursor::new(payload), "p.pkg")
            .unwrap();
        let b = registry
            .save("u1", "pkg", "1", Cursor::new(payload), "p.pkg")
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.storage_path, b.storage_path);
        assert_eq!(a.sha256, b.sha256);
    }

    #[test]
    fn test_get_after_save() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();

        let saved = registry
            .save("u1", "pkg", "1", Cursor::new(b"abc".as_slice()), "p.pkg")
            .unwrap();
        assert_eq!(registry.get(&saved.id), Some(saved));
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        assert!(registry.get("feedfacefeedfacefeedfacefeedface").is_none());
        assert!(registry.open_blob("feedfacefeedfacefeedfacefeedface").unwrap().is_none());
    }

    #[test]
    fn test_empty_owner_rejected_without_orphan() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();

        let err = registry
            .save("", "pkg", "1", Cursor::new(b"abc".as_slice()), "p.pkg")
            .unwrap_err();
        assert!(matches!(err, Error::OwnerRequired));

        // No blob file was written.
        let blobs = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "pkg")
            })
            .count();
        assert_eq!(blobs, 0);
    }

    #[test]
    fn test_records_survive_restart() {
        let dir = TempDir::new().unwrap();
        let mut expected: Vec<(String, String, String)> = Vec::new();
        {
            let registry = Registry::open(dir.path()).unwrap();
            for i in 0..3 {
                let rec = registry
                    .save(
                        "u1",
                        &format!("pkg{i}"),
                        "1",
                        Cursor::new(format!("payload {i}").into_bytes()),
                        "p.pkg",
                    )
                    .unwrap();
                expected.push((rec.id, rec.sha256, rec.owner));
            }
            registry.close();
        }

        let registry = Registry::open(dir.path()).unwrap();
        let mut reloaded: Vec<(String, String, String)> = registry
            .list(Some("u1"))
            .into_iter()
            .map(|r| (r.id, r.sha256, r.owner))
            .collect();
        expected.sort();
        reloaded.sort();
        assert_eq!(reloaded, expected);
    }

    #[test]
    fn test_blob_missing_detected() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();

        let rec = registry
            .save("u1", "pkg", "1", Cursor::new(b"abc".as_slice()), "p.pkg")
            .unwrap();
        std::fs::remove_file(&rec.storage_path).unwrap();

        let err = registry.open_blob(&rec.id).unwrap_err();
        assert!(matches!(err, Error::BlobMissing { .. }));
    }

    #[test]
    fn test_concurrent_saves() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        const UPLOADS: usize = 50;

        let ids = std::thread::scope(|s| {
            let handles: Vec<_> = (0..UPLOADS)
                .map(|i| {
                    let registry = &registry;
                    s.spawn(move || {
                        registry
                            .save(
                                "u1",
                                &format!("pkg{i}"),
                                "1",
                                Cursor::new(format!("payload {i}").into_bytes()),
                                "p.pkg",
                            )
                            .unwrap()
                            .id
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<std::collections::HashSet<_>>()
        });

        assert_eq!(ids.len(), UPLOADS);
        assert_eq!(registry.list(None).len(), UPLOADS);
    }
}
