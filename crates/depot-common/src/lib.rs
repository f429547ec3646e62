//! Depot Common - Shared types and utilities
//!
//! This crate provides the artifact record type and the streaming
//! content digest used across all Depot components.

pub mod checksum;
pub mod types;

pub use checksum::ContentDigest;
pub use types::ArtifactRecord;
