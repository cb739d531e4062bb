//! Helm chart archive reader.
//!
//! A chart package is a gzip-compressed tar stream whose top-level directory
//! holds a `Chart.yaml` descriptor. Reading a package is a pure function of
//! its bytes; nothing here touches storage.

use std::collections::BTreeMap;
use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tar::Archive;

use crate::error::{AppError, ArchiveError, Result};

/// Name of the descriptor file inside a chart package.
pub const DESCRIPTOR_FILE: &str = "Chart.yaml";

/// Chart.yaml contents: the two fields the index logic depends on, plus every
/// other top-level key passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub name: String,
    pub version: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_yaml::Value>,
}

impl ChartDescriptor {
    /// Parse descriptor text.
    ///
    /// `name` and `version` must be non-empty strings. Plain integers are
    /// accepted; floats are not, since `1.10` would read back as `1.1`.
    pub fn from_yaml(text: &str) -> std::result::Result<Self, ArchiveError> {
        let doc: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| ArchiveError::InvalidDescriptor(e.to_string()))?;
        let serde_yaml::Value::Mapping(mapping) = doc else {
            return Err(ArchiveError::InvalidDescriptor(
                "descriptor is not a mapping".to_string(),
            ));
        };

        let mut name = None;
        let mut version = None;
        let mut fields = BTreeMap::new();

        for (key, value) in mapping {
            let serde_yaml::Value::String(key) = key else {
                return Err(ArchiveError::InvalidDescriptor(format!(
                    "non-string key {:?}",
                    key
                )));
            };
            match key.as_str() {
                "name" => name = Some(scalar_text("name", &value)?),
                "version" => version = Some(scalar_text("version", &value)?),
                _ => {
                    fields.insert(key, value);
                }
            }
        }

        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ArchiveError::InvalidDescriptor("missing 'name'".to_string()))?;
        let version = version
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ArchiveError::InvalidDescriptor("missing 'version'".to_string()))?;

        for (field, value) in [("name", &name), ("version", &version)] {
            if !is_safe_file_component(value) {
                return Err(ArchiveError::InvalidDescriptor(format!(
                    "{} '{}' cannot be used in a file name",
                    field, value
                )));
            }
        }

        Ok(Self {
            name,
            version,
            fields,
        })
    }

    /// Conventional package file name: `<name>-<version>.tgz`
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}

fn scalar_text(field: &str, value: &serde_yaml::Value) -> std::result::Result<String, ArchiveError> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.trim().to_string()),
        serde_yaml::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        serde_yaml::Value::Number(n) => Err(ArchiveError::InvalidDescriptor(format!(
            "'{}' is the number {}; quote it to keep it exact",
            field, n
        ))),
        _ => Err(ArchiveError::InvalidDescriptor(format!(
            "'{}' must be a string",
            field
        ))),
    }
}

fn is_safe_file_component(value: &str) -> bool {
    !value.contains(|c: char| c == '/' || c == '\\')
        && value != "."
        && value != ".."
        && !value.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// Upper bound on the size of `Chart.yaml` inside a package.
pub const MAX_DESCRIPTOR_BYTES: u64 = 1024 * 1024;

/// Extract and parse the chart descriptor from package bytes.
///
/// The archive is decompressed as a stream and reading stops at the first
/// descriptor, so entries after it are never inflated.
pub fn parse_descriptor(content: &[u8]) -> std::result::Result<ChartDescriptor, ArchiveError> {
    if content.is_empty() {
        return Err(ArchiveError::Malformed("empty archive".to_string()));
    }

    let mut archive = Archive::new(GzDecoder::new(content));
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::Malformed(format!("invalid tar stream: {}", e)))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| ArchiveError::Malformed(format!("invalid tar entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| ArchiveError::Malformed(format!("invalid path in archive: {}", e)))?
            .into_owned();

        if !is_descriptor_path(&path) {
            continue;
        }

        if entry.size() > MAX_DESCRIPTOR_BYTES {
            return Err(ArchiveError::InvalidDescriptor(format!(
                "Chart.yaml is {} bytes, limit is {}",
                entry.size(),
                MAX_DESCRIPTOR_BYTES
            )));
        }

        let mut text = String::new();
        entry
            .take(MAX_DESCRIPTOR_BYTES)
            .read_to_string(&mut text)
            .map_err(|e| ArchiveError::Malformed(format!("failed to read Chart.yaml: {}", e)))?;
        return ChartDescriptor::from_yaml(&text);
    }

    Err(ArchiveError::MissingDescriptor)
}

/// `Chart.yaml` or `<chart-dir>/Chart.yaml`. Subchart descriptors under
/// `<chart-dir>/charts/` sit deeper and are skipped.
fn is_descriptor_path(path: &std::path::Path) -> bool {
    let components: Vec<_> = path
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect();
    matches!(components.len(), 1 | 2)
        && components
            .last()
            .map(|c| c.as_os_str() == DESCRIPTOR_FILE)
            .unwrap_or(false)
}

/// Hex-encoded SHA-256 of the given bytes, the digest format `helm` verifies.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// An uploaded chart package together with its parsed descriptor.
#[derive(Debug, Clone)]
pub struct ChartArchive {
    content: Bytes,
    descriptor: ChartDescriptor,
}

impl ChartArchive {
    /// Parse an uploaded package.
    pub fn parse(content: Bytes) -> std::result::Result<Self, ArchiveError> {
        let descriptor = parse_descriptor(&content)?;
        Ok(Self {
            content,
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &ChartDescriptor {
        &self.descriptor
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Archive length in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn file_name(&self) -> String {
        self.descriptor.archive_file_name()
    }

    pub fn digest(&self) -> String {
        sha256_hex(&self.content)
    }
}

/// Split a package file name into chart name and version.
/// Format: <name>-<version>.tgz
pub fn parse_chart_filename(filename: &str) -> Result<(String, String)> {
    let stem = filename.strip_suffix(".tgz").ok_or_else(|| {
        AppError::NotFound(format!("Not a Helm chart package: {}", filename))
    })?;

    // The version starts after the first hyphen that is followed by a digit,
    // so names like "my-chart" and pre-release versions both survive.
    let split = stem
        .char_indices()
        .filter(|(i, c)| *c == '-' && stem[i + 1..].starts_with(|d: char| d.is_ascii_digit()))
        .map(|(i, _)| i)
        .next();

    match split {
        Some(i) if i > 0 => Ok((stem[..i].to_string(), stem[i + 1..].to_string())),
        _ => Err(AppError::NotFound(format!(
            "Invalid Helm chart filename: {}",
            filename
        ))),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{build_tgz, chart_tgz};
    use super::*;

    #[test]
    fn test_parse_descriptor_from_chart_dir() {
        let descriptor = parse_descriptor(&chart_tgz("tomcat", "0.4.1")).unwrap();
        assert_eq!(descriptor.name, "tomcat");
        assert_eq!(descriptor.version, "0.4.1");
        assert_eq!(
            descriptor.fields.get("appVersion"),
            Some(&serde_yaml::Value::String("7.0".into()))
        );
        assert!(!descriptor.fields.contains_key("name"));
    }

    #[test]
    fn test_parse_descriptor_keeps_structured_fields() {
        let yaml = r#"
apiVersion: v2
name: nginx
version: 1.2.3
keywords:
  - nginx
  - web
maintainers:
  - name: John Doe
    email: john@example.com
"#;
        let tgz = build_tgz(&[("nginx/Chart.yaml", yaml.as_bytes())]);
        let descriptor = parse_descriptor(&tgz).unwrap();
        assert!(descriptor.fields["keywords"].is_sequence());
        assert!(descriptor.fields["maintainers"].is_sequence());
    }

    #[test]
    fn test_subchart_descriptor_is_ignored() {
        let tgz = build_tgz(&[
            ("app/charts/db/Chart.yaml", &b"name: db\nversion: 9.9.9\n"[..]),
            ("app/Chart.yaml", &b"name: app\nversion: 1.0.0\n"[..]),
        ]);
        let descriptor = parse_descriptor(&tgz).unwrap();
        assert_eq!(descriptor.name, "app");
    }

    #[test]
    fn test_numeric_version_is_stringified() {
        let descriptor = ChartDescriptor::from_yaml("name: demo\nversion: 2\n").unwrap();
        assert_eq!(descriptor.version, "2");
    }

    #[test]
    fn test_float_version_is_rejected() {
        let err = ChartDescriptor::from_yaml("name: demo\nversion: 1.10\n").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidDescriptor(_)));

        let quoted = ChartDescriptor::from_yaml("name: demo\nversion: \"1.10\"\n").unwrap();
        assert_eq!(quoted.version, "1.10");
    }

    #[test]
    fn test_structured_version_is_rejected() {
        assert!(matches!(
            ChartDescriptor::from_yaml("name: demo\nversion: [1, 2]\n"),
            Err(ArchiveError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_trailing_entries_are_not_inflated() {
        // 8 MiB of zeros after the descriptor, then cut the gzip stream short.
        // Reading to the end would hit the truncation; stopping at Chart.yaml
        // never gets there.
        let padding = vec![0u8; 8 * 1024 * 1024];
        let full = build_tgz(&[
            ("big/Chart.yaml", &b"name: big\nversion: 1.0.0\n"[..]),
            ("big/files/blob.bin", padding.as_slice()),
        ]);
        let truncated = &full[..full.len() - 64];

        let descriptor = parse_descriptor(truncated).unwrap();
        assert_eq!(descriptor.name, "big");
        assert_eq!(descriptor.version, "1.0.0");
    }

    #[test]
    fn test_oversized_descriptor_is_rejected() {
        let mut yaml = String::from("name: huge\nversion: 1.0.0\n");
        yaml.push_str(&"# padding\n".repeat(MAX_DESCRIPTOR_BYTES as usize / 10 + 1));
        let tgz = build_tgz(&[("huge/Chart.yaml", yaml.as_bytes())]);

        assert!(matches!(
            parse_descriptor(&tgz),
            Err(ArchiveError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_missing_descriptor() {
        let tgz = build_tgz(&[("tomcat/values.yaml", b"replicaCount: 1\n")]);
        assert!(matches!(
            parse_descriptor(&tgz),
            Err(ArchiveError::MissingDescriptor)
        ));
    }

    #[test]
    fn test_empty_bytes_are_malformed() {
        assert!(matches!(
            parse_descriptor(&[]),
            Err(ArchiveError::Malformed(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_descriptor(b"this is not a gzip archive"),
            Err(ArchiveError::Malformed(_))
        ));
    }

    #[test]
    fn test_descriptor_without_version_is_invalid() {
        let tgz = build_tgz(&[("x/Chart.yaml", b"name: x\n")]);
        assert!(matches!(
            parse_descriptor(&tgz),
            Err(ArchiveError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_descriptor_with_path_in_name_is_invalid() {
        assert!(matches!(
            ChartDescriptor::from_yaml("name: ../evil\nversion: 1.0.0\n"),
            Err(ArchiveError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_chart_archive_accessors() {
        let content = chart_tgz("tomcat", "0.4.1");
        let archive = ChartArchive::parse(content.clone()).unwrap();
        assert_eq!(archive.file_name(), "tomcat-0.4.1.tgz");
        assert_eq!(archive.size(), content.len());
        assert_eq!(archive.digest().len(), 64);
        assert_eq!(archive.digest(), sha256_hex(&content));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_chart_filename() {
        let (name, version) = parse_chart_filename("nginx-1.2.3.tgz").unwrap();
        assert_eq!(name, "nginx");
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn test_parse_chart_filename_with_hyphen() {
        let (name, version) = parse_chart_filename("my-awesome-chart-0.1.0-rc.1.tgz").unwrap();
        assert_eq!(name, "my-awesome-chart");
        assert_eq!(version, "0.1.0-rc.1");
    }

    #[test]
    fn test_parse_chart_filename_rejects_non_packages() {
        assert!(parse_chart_filename("index.yaml").is_err());
        assert!(parse_chart_filename("nginx.tgz").is_err());
    }
}
