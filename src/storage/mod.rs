//! Storage backend abstraction for uploaded books
//!
//! This module provides a clean abstraction over the byte stores a book can
//! live in (local filesystem, Cloudinary) with a unified interface. Exactly
//! one backend is active per process; it is chosen at startup and injected
//! into the service.

use async_trait::async_trait;

use crate::error::Result;

pub mod local;
pub mod factory;

/// Prefix of the synthetic reference handed out by the local backend
pub const LOCAL_REFERENCE_PREFIX: &str = "/local-files/";

/// Core storage backend trait that all storage implementations must implement
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a blob under its canonical key.
    /// Returns the reference recorded as the book's download URL.
    async fn put(&self, key: &str, data: &[u8]) -> Result<String>;

    /// Retrieve a blob. `reference` is the value `put` returned for `key`;
    /// each backend decides which of the two it resolves by.
    async fn get(&self, key: &str, reference: &str) -> Result<Vec<u8>>;

    /// Delete a blob. Deleting something that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a blob exists for the given key
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Whether `reference` looks like something this backend handed out
    fn owns_reference(&self, reference: &str) -> bool;

    /// Get a human-readable identifier for this storage backend type
    fn storage_type(&self) -> &'static str;

    /// Initialize the storage backend (create directories, validate access, etc.)
    async fn initialize(&self) -> Result<()>;
}

/// Storage configuration enum for the supported backend types
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local filesystem storage
    Local {
        upload_path: String,
    },
    /// Cloudinary raw-asset storage
    Cloudinary {
        cloudinary_config: crate::config::CloudinaryConfig,
    },
}
