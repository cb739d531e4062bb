//! Time-bounded wrapper around any storage backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::StorageBackend;
use crate::error::{AppError, Result};

/// Fails any call that does not finish within `limit` instead of waiting on
/// a stuck backend forever.
pub struct TimeoutStorage<S> {
    inner: S,
    limit: Duration,
}

impl<S: StorageBackend> TimeoutStorage<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, op: &str, key: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, key, limit_ms = self.limit.as_millis() as u64, "Storage call timed out");
                Err(AppError::Storage(format!(
                    "{} {} timed out after {:?}",
                    op, key, self.limit
                )))
            }
        }
    }
}

#[async_trait]
impl<S: StorageBackend> StorageBackend for TimeoutStorage<S> {
    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        self.bounded("put", key, self.inner.put(key, content)).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.bounded("get", key, self.inner.get(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.bounded("exists", key, self.inner.exists(key)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bounded("delete", key, self.inner.delete(key)).await
    }
}
