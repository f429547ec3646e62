//! Error types for the registry core.

use thiserror::Error;

/// Common result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied no owner; rejected before any storage side effect.
    #[error("owner is required")]
    OwnerRequired,

    /// The OS random source could not supply bytes. Fatal to the upload.
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(rand::Error),

    /// The durable index could not be opened. Fatal to the service.
    #[error("metadata index open failed: {0}")]
    IndexOpen(String),

    /// A durable commit failed after the in-memory mirror was updated.
    #[error("metadata commit failed for '{id}': {reason}")]
    IndexWrite { id: String, reason: String },

    /// A blob file already exists for a freshly generated identifier.
    /// Indicates identifier reuse, which should never happen.
    #[error("blob already exists for '{id}'")]
    BlobAlreadyExists { id: String },

    /// I/O failure while streaming a blob to disk.
    #[error("blob write failed for '{id}': {source}")]
    BlobWrite {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// A record exists but its blob file is gone.
    #[error("blob missing for '{id}': {source}")]
    BlobMissing {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// HTTP status code for the gateway boundary.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::OwnerRequired => 400,
            Self::EntropyUnavailable(_)
            | Self::IndexOpen(_)
            | Self::IndexWrite { .. }
            | Self::BlobAlreadyExists { .. }
            | Self::BlobWrite { .. }
            | Self::BlobMissing { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::OwnerRequired.http_status_code(), 400);
        assert_eq!(
            Error::BlobAlreadyExists {
                id: "x".to_string()
            }
            .http_status_code(),
            500
        );
    }
}
