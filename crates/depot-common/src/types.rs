//! Core type definitions for Depot
//!
//! This module defines the artifact record, the unit of the metadata
//! index. Records are created once at upload time and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata describing one stored artifact.
///
/// `storage_path` is derived from the registry root and the artifact
/// id at load time; it is never serialized, neither into the durable
/// index nor into external responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Opaque unique identifier, assigned by the registry.
    pub id: String,
    /// Identifier of the uploading principal.
    pub owner: String,
    /// Human-readable label; defaults to the uploaded filename.
    pub name: String,
    /// Caller-supplied version string.
    pub version: String,
    /// Hex-encoded SHA-256 of the stored bytes, measured during the write.
    pub sha256: String,
    /// Byte length of the stored blob, measured during the write.
    pub size: u64,
    /// Location of the blob on disk. Internal only.
    #[serde(skip)]
    pub storage_path: PathBuf,
    /// Commit timestamp.
    pub uploaded_at: DateTime<Utc>,
}
