//! Repository index maintenance.
//!
//! Every upload runs load → merge → write against the index key while holding
//! that key's lock, so concurrent uploads of different versions cannot
//! overwrite each other's records. The catalog write is the commit point: an
//! error or a dropped request before it leaves the stored index exactly as it
//! was.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;

use crate::config::Config;
use crate::error::{AppError, StoreError};
use crate::formats::helm::ChartArchive;
use crate::models::catalog::Catalog;
use crate::services::index_merge::{merge, MergeOutcome};
use crate::services::key_lock::KeyLocks;
use crate::storage::StorageBackend;

/// Result of publishing one chart archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The version was new; archive and index were written.
    Added { name: String, version: String, digest: String },
    /// The version was already indexed; nothing was written.
    AlreadyPresent { name: String, version: String },
}

impl UpdateOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, UpdateOutcome::Added { .. })
    }
}

/// Index maintenance service
pub struct IndexService {
    storage: Arc<dyn StorageBackend>,
    locks: Arc<KeyLocks>,
    index_key: String,
    base_url: String,
    lock_timeout: Duration,
}

impl IndexService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        locks: Arc<KeyLocks>,
        index_key: impl Into<String>,
        base_url: impl Into<String>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            locks,
            index_key: index_key.into(),
            base_url: base_url.into(),
            lock_timeout,
        }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn StorageBackend>,
        locks: Arc<KeyLocks>,
    ) -> Self {
        Self::new(
            storage,
            locks,
            config.index_key.clone(),
            config.base_url.clone(),
            config.lock_timeout,
        )
    }

    pub fn index_key(&self) -> &str {
        &self.index_key
    }

    /// Archives live next to the index they are listed in.
    pub fn archive_key(&self, file_name: &str) -> String {
        match self.index_key.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, file_name),
            None => file_name.to_string(),
        }
    }

    /// Read the persisted index, `None` when it has never been written.
    pub async fn load(&self) -> Result<Option<Catalog>, StoreError> {
        let exists = self
            .storage
            .exists(&self.index_key)
            .await
            .map_err(storage_unreachable)?;
        if !exists {
            return Ok(None);
        }

        let content = self
            .storage
            .get(&self.index_key)
            .await
            .map_err(storage_unreachable)?;

        Catalog::from_yaml(&content).map(Some).map_err(|e| {
            tracing::error!(key = %self.index_key, error = %e, "Stored index does not parse");
            StoreError::CorruptCatalog(format!("{}: {}", self.index_key, e))
        })
    }

    /// Publish an archive: store it and add its version to the index, unless
    /// the index already lists that version.
    pub async fn update(&self, archive: &ChartArchive) -> Result<UpdateOutcome, StoreError> {
        let descriptor = archive.descriptor();
        let _guard = self.locks.acquire(&self.index_key, self.lock_timeout).await?;

        let current = self.load().await?;
        let file_name = archive.file_name();
        if let Some(owner) = current
            .as_ref()
            .and_then(|catalog| catalog.record_for_archive(&file_name))
            .filter(|r| r.name != descriptor.name || r.version != descriptor.version)
        {
            tracing::warn!(
                chart = %descriptor.name,
                version = %descriptor.version,
                owner = %owner.name,
                owner_version = %owner.version,
                "Package file name already taken by another chart version"
            );
            return Err(StoreError::ArchiveConflict {
                file_name,
                owner: format!("{} {}", owner.name, owner.version),
            });
        }

        let (catalog, outcome) = merge(
            current,
            descriptor,
            &file_name,
            archive.content(),
            &self.base_url,
            Utc::now(),
        );

        if outcome == MergeOutcome::AlreadyPresent {
            tracing::info!(
                chart = %descriptor.name,
                version = %descriptor.version,
                "Chart version already indexed, skipping"
            );
            return Ok(UpdateOutcome::AlreadyPresent {
                name: descriptor.name.clone(),
                version: descriptor.version.clone(),
            });
        }

        let serialized = catalog
            .to_yaml()
            .map_err(|e| StoreError::CorruptCatalog(format!("failed to serialize index: {}", e)))?;

        self.storage
            .put(&self.archive_key(&file_name), archive.content().clone())
            .await
            .map_err(storage_unreachable)?;
        self.storage
            .put(&self.index_key, Bytes::from(serialized))
            .await
            .map_err(storage_unreachable)?;

        let digest = archive.digest();
        tracing::info!(
            chart = %descriptor.name,
            version = %descriptor.version,
            digest = %digest,
            size = archive.size(),
            "Chart version added to index"
        );

        Ok(UpdateOutcome::Added {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            digest,
        })
    }
}

fn storage_unreachable(err: AppError) -> StoreError {
    StoreError::Unreachable(err.to_string())
}
