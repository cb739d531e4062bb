//! Domain models.

pub mod catalog;
