//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Where chart archives and the index live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Filesystem,
    Memory,
}

impl FromStr for StorageKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => Ok(StorageKind::Filesystem),
            "memory" => Ok(StorageKind::Memory),
            other => Err(AppError::Config(format!(
                "Unknown STORAGE_BACKEND '{}', expected 'filesystem' or 'memory'",
                other
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (host:port)
    pub bind_address: String,

    /// Log level
    pub log_level: String,

    /// Storage backend
    pub storage_backend: StorageKind,

    /// Filesystem storage path (when storage_backend = filesystem)
    pub storage_path: String,

    /// Prefix of every download URL written to the index, always ending in '/'
    pub base_url: String,

    /// Storage key of the repository index
    pub index_key: String,

    /// Upper bound for a single storage call
    pub storage_timeout: Duration,

    /// Upper bound for waiting on the index lock
    pub lock_timeout: Duration,

    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            storage_backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "filesystem".into())
                .parse()?,
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "/var/lib/chart-keeper/charts".into()),
            base_url: normalize_base_url(
                &env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080/".into()),
            ),
            index_key: env::var("INDEX_KEY").unwrap_or_else(|_| "index.yaml".into()),
            storage_timeout: Duration::from_secs(parse_var("STORAGE_TIMEOUT_SECS", 30)?),
            lock_timeout: Duration::from_secs(parse_var("LOCK_TIMEOUT_SECS", 10)?),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 512 * 1024 * 1024)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            log_level: "info".into(),
            storage_backend: StorageKind::Filesystem,
            storage_path: "/var/lib/chart-keeper/charts".into(),
            base_url: "http://localhost:8080/".into(),
            index_key: "index.yaml".into(),
            storage_timeout: Duration::from_secs(30),
            lock_timeout: Duration::from_secs(10),
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

/// Download URLs are built as `base ++ file name`, so the base must end in '/'.
pub fn normalize_base_url(raw: &str) -> String {
    if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    }
}
