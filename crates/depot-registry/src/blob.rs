//! Blob persistence.
//!
//! Streams an uploaded artifact to disk under a path derived from its
//! identifier while feeding every chunk into a running SHA-256
//! accumulator, so the recorded hash and size reflect the bytes
//! actually written rather than anything the client declared.

use crate::error::{Error, Result};
use depot_common::ContentDigest;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// File extension for stored blobs.
pub const BLOB_EXT: &str = "pkg";

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Blob location for an identifier. Pure function of `root` and `id`;
/// unique identifiers imply unique paths, so no lookup table is needed.
#[must_use]
pub fn blob_path(root: &Path, id: &str) -> PathBuf {
    root.join(format!("{id}.{BLOB_EXT}"))
}

/// Stream `reader` into the blob file for `id`, returning the hex
/// SHA-256 digest and the number of bytes written.
///
/// The file is created with `create_new`: a pre-existing file for the
/// same identifier indicates identifier reuse and fails with
/// [`Error::BlobAlreadyExists`]. A mid-copy I/O failure returns
/// [`Error::BlobWrite`]; removal of the partial file is left to the
/// caller and is best-effort only. The write is not transactional
/// with the subsequent metadata commit.
pub fn write_blob(root: &Path, id: &str, mut reader: impl Read) -> Result<(String, u64)> {
    let path = blob_path(root, id);
    let mut out = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(Error::BlobAlreadyExists { id: id.to_string() });
        }
        Err(e) => {
            return Err(Error::BlobWrite {
                id: id.to_string(),
                source: e,
            });
        }
    };

    let mut digest = ContentDigest::new();
    let mut size: u64 = 0;
    let mut buf = [0u8; COPY_BUF_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::BlobWrite {
                    id: id.to_string(),
                    source: e,
                });
            }
        };
        if let Err(e) = out.write_all(&buf[..n]) {
            return Err(Error::BlobWrite {
                id: id.to_string(),
                source: e,
            });
        }
        digest.update(&buf[..n]);
        size += n as u64;
    }

    Ok((digest.finalize_hex(), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_common::checksum::sha256_hex;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_write_blob_hash_and_size() {
        let dir = TempDir::new().unwrap();
        let payload = b"0123456789";

        let (hash, size) = write_blob(dir.path(), "aa01", Cursor::new(payload)).unwrap();

        assert_eq!(size, 10);
        assert_eq!(hash, sha256_hex(payload));
        assert_eq!(std::fs::read(blob_path(dir.path(), "aa01")).unwrap(), payload);
    }

    #[test]
    fn test_write_blob_rejects_existing_file() {
        let dir = TempDir::new().unwrap();
        write_blob(dir.path(), "bb02", Cursor::new(b"one".as_slice())).unwrap();

        let err = write_blob(dir.path(), "bb02", Cursor::new(b"two".as_slice())).unwrap_err();
        assert!(matches!(err, Error::BlobAlreadyExists { .. }));
        // First write is untouched.
        assert_eq!(std::fs::read(blob_path(dir.path(), "bb02")).unwrap(), b"one");
    }

    #[test]
    fn test_write_blob_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");

        let err = write_blob(&gone, "cc03", Cursor::new(b"x".as_slice())).unwrap_err();
        assert!(matches!(err, Error::BlobWrite { .. }));
    }

    #[test]
    fn test_read_failure_leaves_partial_file() {
        struct FailAfter(usize);
        impl Read for FailAfter {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0 == 0 {
                    return Err(std::io::Error::other("stream torn"));
                }
                let n = self.0.min(buf.len());
                buf[..n].fill(b'z');
                self.0 -= n;
                Ok(n)
            }
        }

        let dir = TempDir::new().unwrap();
        let err = write_blob(dir.path(), "dd04", FailAfter(5)).unwrap_err();
        assert!(matches!(err, Error::BlobWrite { .. }));
        // Partial file remains; cleanup is the caller's decision.
        assert!(blob_path(dir.path(), "dd04").exists());
    }
}
