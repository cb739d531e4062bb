//! Business logic services.

pub mod index_merge;
pub mod index_service;
pub mod key_lock;
