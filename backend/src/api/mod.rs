//! API module - HTTP handlers and middleware.

pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::config::Config;
use crate::services::index_service::IndexService;
use crate::services::key_lock::KeyLocks;
use crate::storage::StorageBackend;
use std::sync::Arc;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn StorageBackend>,
    pub index_service: Arc<IndexService>,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn StorageBackend>) -> Self {
        let index_service = Arc::new(IndexService::from_config(
            &config,
            storage.clone(),
            KeyLocks::new(),
        ));
        Self {
            config,
            storage,
            index_service,
        }
    }
}

pub type SharedState = Arc<AppState>;
