//! Depot Registry - Artifact storage core
//!
//! This crate implements the registry subsystem:
//! - Identifier generation (128-bit random, hex)
//! - Blob persistence with streaming SHA-256
//! - Durable metadata index (redb) with an in-memory mirror
//! - The registry facade composing the above

pub mod blob;
pub mod error;
pub mod id;
pub mod index;
pub mod registry;

// Re-exports
pub use blob::{BLOB_EXT, blob_path, write_blob};
pub use error::{Error, Result};
pub use id::generate_id;
pub use index::MetadataIndex;
pub use registry::Registry;
