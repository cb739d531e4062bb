//! Storage backends.
//!
//! Every backend offers the same four operations on opaque keys. Each call is
//! atomic on its own; there is no cross-call transaction, so callers that
//! need read-modify-write consistency coordinate through
//! [`crate::services::key_lock`].

pub mod filesystem;
pub mod memory;
pub mod timeout;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{Config, StorageKind};
use crate::error::Result;

/// Storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store content with the given key, replacing any previous content
    async fn put(&self, key: &str, content: Bytes) -> Result<()>;

    /// Retrieve content by key
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete content by key
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Build the configured backend, bounded by the configured storage timeout.
pub fn from_config(config: &Config) -> Arc<dyn StorageBackend> {
    match config.storage_backend {
        StorageKind::Filesystem => Arc::new(timeout::TimeoutStorage::new(
            filesystem::FilesystemStorage::new(&config.storage_path),
            config.storage_timeout,
        )),
        StorageKind::Memory => Arc::new(timeout::TimeoutStorage::new(
            memory::MemoryStorage::new(),
            config.storage_timeout,
        )),
    }
}
