//! Folding one accepted chart version into the repository index.
//!
//! [`merge`] is pure: the same inputs always give the same index, so the
//! whole version-acceptance policy can be tested without storage.

use chrono::{DateTime, Utc};

use crate::formats::helm::{sha256_hex, ChartDescriptor};
use crate::models::catalog::{Catalog, VersionRecord, RESERVED_RECORD_KEYS};

/// Whether a merge changed the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new version record was appended.
    Added,
    /// The chart already had this version; the index is unchanged.
    AlreadyPresent,
}

/// Add `descriptor` to `catalog` unless that chart version is already listed.
///
/// A missing catalog starts out empty. New records are appended, so each
/// chart's list stays in acceptance order. When the version exists the input
/// catalog comes back untouched, including its `generated` time.
pub fn merge(
    catalog: Option<Catalog>,
    descriptor: &ChartDescriptor,
    archive_name: &str,
    archive_bytes: &[u8],
    base_url: &str,
    now: DateTime<Utc>,
) -> (Catalog, MergeOutcome) {
    let mut catalog = catalog.unwrap_or_else(|| Catalog::empty(now));

    if catalog.contains(&descriptor.name, &descriptor.version) {
        return (catalog, MergeOutcome::AlreadyPresent);
    }

    let record = new_record(descriptor, archive_name, archive_bytes, base_url, now);
    catalog
        .entries
        .entry(descriptor.name.clone())
        .or_default()
        .push(record);
    catalog.generated = now;

    (catalog, MergeOutcome::Added)
}

fn new_record(
    descriptor: &ChartDescriptor,
    archive_name: &str,
    archive_bytes: &[u8],
    base_url: &str,
    now: DateTime<Utc>,
) -> VersionRecord {
    let fields = descriptor
        .fields
        .iter()
        .filter(|(key, _)| !RESERVED_RECORD_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    VersionRecord {
        name: descriptor.name.clone(),
        version: descriptor.version.clone(),
        created: now,
        urls: vec![format!("{}{}", base_url, archive_name)],
        digest: Some(sha256_hex(archive_bytes)),
        fields,
    }
}
