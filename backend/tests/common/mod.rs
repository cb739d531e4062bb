//! Common test utilities for HTTP-level tests
//!
//! - Test application setup over in-memory storage
//! - Request/response helpers for driving the router with `oneshot`

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use bytes::Bytes;
use tower::ServiceExt;

use chart_keeper_backend::api::{routes::create_router, AppState};
use chart_keeper_backend::config::{Config, StorageKind};
use chart_keeper_backend::storage::memory::MemoryStorage;

pub const BASE_URL: &str = "http://charts.test.local/";

/// Router plus a handle on its storage for assertions
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryStorage>,
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        log_level: "error".into(),
        storage_backend: StorageKind::Memory,
        storage_path: std::env::temp_dir().to_string_lossy().into_owned(),
        base_url: BASE_URL.into(),
        index_key: "index.yaml".into(),
        storage_timeout: Duration::from_secs(5),
        lock_timeout: Duration::from_secs(10),
        max_upload_bytes: 16 * 1024 * 1024,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let state = Arc::new(AppState::new(test_config(), storage.clone()));
        Self {
            router: create_router(state),
            storage,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Bytes) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .expect("valid request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn upload(&self, body: Bytes) -> Response<Body> {
        self.send(Method::POST, "/", body).await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, Bytes::new()).await
    }

    /// Fetch and parse index.yaml through the HTTP surface.
    pub async fn index(&self) -> serde_yaml::Value {
        let resp = self.get("/index.yaml").await;
        assert!(resp.status().is_success(), "index.yaml status {}", resp.status());
        let body = body_bytes(resp).await;
        serde_yaml::from_slice(&body).expect("index.yaml parses")
    }
}

pub async fn body_bytes(resp: Response<Body>) -> Bytes {
    axum::body::to_bytes(resp.into_body(), 64 * 1024 * 1024)
        .await
        .expect("body readable")
}
