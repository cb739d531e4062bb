//! Helm repository index (`index.yaml`) document model.
//!
//! Field names and nesting follow the chart repository convention so that
//! `helm repo add` / `helm install` can read the document unmodified:
//!
//! ```yaml
//! apiVersion: v1
//! entries:
//!   tomcat:
//!   - name: tomcat
//!     version: 0.4.1
//!     created: "2020-05-01T10:00:00.000000000+00:00"
//!     digest: 5f0c...
//!     urls:
//!     - http://localhost:8080/tomcat-0.4.1.tgz
//!     appVersion: "7.0"
//! generated: "2020-05-01T10:00:00.000000000+00:00"
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema marker written to every index.
pub const INDEX_API_VERSION: &str = "v1";

/// Repository index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub api_version: String,
    #[serde(with = "helm_time")]
    pub generated: DateTime<Utc>,
    /// Chart name to versions, in the order they were accepted.
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<VersionRecord>>,
    /// Other top-level keys (`serverInfo`, `annotations`, ...) kept as found.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One published chart version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    pub version: String,
    #[serde(with = "helm_time")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Remaining Chart.yaml fields, copied verbatim.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_yaml::Value>,
}

/// Keys computed by the index itself; never taken from a descriptor.
pub const RESERVED_RECORD_KEYS: &[&str] = &["name", "version", "created", "urls", "digest"];

impl Catalog {
    /// An index with no charts.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            api_version: INDEX_API_VERSION.to_string(),
            generated: now,
            entries: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn from_yaml(content: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Versions recorded for a chart, oldest first.
    pub fn versions(&self, chart: &str) -> &[VersionRecord] {
        self.entries.get(chart).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, chart: &str, version: &str) -> bool {
        self.versions(chart).iter().any(|r| r.version == version)
    }

    /// The record whose package is stored under `file_name`, if any.
    pub fn record_for_archive(&self, file_name: &str) -> Option<&VersionRecord> {
        self.entries.values().flatten().find(|record| {
            record
                .urls
                .iter()
                .any(|url| url.rsplit('/').next() == Some(file_name))
        })
    }

    /// Total number of version records across all charts.
    pub fn record_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Timestamps as written by helm: RFC 3339 with nanoseconds and a numeric
/// offset, e.g. `2016-10-06T16:23:20.499814565-06:00`.
pub mod helm_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Nanos, false)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
