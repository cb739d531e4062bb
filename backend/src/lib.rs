//! Chart Keeper - Backend Library
//!
//! Helm chart repository: accepts chart package uploads, keeps `index.yaml`
//! consistent under concurrent uploads, and serves stored files back.

pub mod api;
pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod services;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
