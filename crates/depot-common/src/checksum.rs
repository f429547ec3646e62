//! Content digest utilities for Depot
//!
//! Provides a streaming SHA-256 calculator used while copying uploaded
//! artifacts to disk, so the hash reflects exactly the bytes written.

use sha2::{Digest, Sha256};

/// Streaming SHA-256 content digest.
pub struct ContentDigest {
    sha256: Sha256,
}

impl ContentDigest {
    /// Create a new digest accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sha256: Sha256::new(),
        }
    }

    /// Update the accumulator with more data.
    pub fn update(&mut self, data: &[u8]) {
        self.sha256.update(data);
    }

    /// Finalize and return the lowercase hex digest.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        hex::encode(self.sha256.finalize())
    }
}

impl Default for ContentDigest {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the hex SHA-256 of a full in-memory buffer.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
