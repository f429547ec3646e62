//! Artifact identifier generation.
//!
//! Identifiers are 128 random bits from the OS CSPRNG, rendered as
//! 32 lowercase hex characters. No collision check is performed
//! against existing records: at 128 bits of entropy the collision
//! probability is treated as negligible.

use crate::error::{Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Length of a rendered identifier in hex characters.
pub const ID_LEN: usize = 32;

/// Generate a fresh artifact identifier.
///
/// Fails with [`Error::EntropyUnavailable`] if the OS random source
/// cannot supply bytes; the caller must abort the upload.
pub fn generate_id() -> Result<String> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(Error::EntropyUnavailable)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_shape() {
        let id = generate_id().unwrap();
        assert_eq!(id.len(), ID_LEN);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_ids_are_distinct() {
        let a = generate_id().unwrap();
        let b = generate_id().unwrap();
        assert_ne!(a, b);
    }
}
