//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::StorageBackend;
use crate::error::{AppError, Result};

/// Process-local storage, mostly for tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AppError {
    AppError::Storage("memory storage lock poisoned".into())
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), content);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .read()
            .map_err(|_| poisoned())?
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .map_err(|_| poisoned())?
            .contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| poisoned())?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(key.to_string()))
    }
}
