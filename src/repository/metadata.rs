//! `maven-metadata.xml` model
//!
//! Artifact-level metadata lists every published version; version-level
//! metadata of a `-SNAPSHOT` carries the timestamp and build number of the
//! latest deployed snapshot.

use quick_xml::de::from_reader;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub versioning: Versioning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Versioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default)]
    pub versions: Versions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default, rename = "version")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub build_number: Option<u32>,
}

impl VersionMetadata {
    /// No versions, no snapshot; the identity of [`VersionMetadata::merge`]
    pub const EMPTY: VersionMetadata = VersionMetadata {
        group_id: None,
        artifact_id: None,
        versioning: Versioning {
            latest: None,
            release: None,
            versions: Versions { items: Vec::new() },
            snapshot: None,
            last_updated: None,
        },
    };

    pub fn parse(bytes: &[u8]) -> Result<Self, FetchError> {
        Ok(from_reader(bytes)?)
    }

    pub fn versions(&self) -> &[String] {
        &self.versioning.versions.items
    }

    pub fn is_empty(&self) -> bool {
        let versioning = &self.versioning;
        versioning.versions.items.is_empty()
            && versioning.snapshot.is_none()
            && versioning.latest.is_none()
            && versioning.release.is_none()
    }

    /// Combine metadata from two repositories.
    ///
    /// An empty side yields the other unchanged. Otherwise the version lists
    /// are concatenated and per-repository fields (snapshot, latest, release)
    /// are dropped since they no longer describe a single source.
    pub fn merge(self, other: VersionMetadata) -> VersionMetadata {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }

        let mut items = self.versioning.versions.items;
        items.extend(other.versioning.versions.items);

        VersionMetadata {
            group_id: self.group_id.or(other.group_id),
            artifact_id: self.artifact_id.or(other.artifact_id),
            versioning: Versioning {
                versions: Versions { items },
                ..Versioning::default()
            },
        }
    }

    /// Dated file version for a `-SNAPSHOT`, e.g. `1.0.0-20200101.120000-3`.
    ///
    /// `None` when no snapshot entry with both timestamp and build number exists.
    pub fn dated_snapshot_version(&self, version: &str) -> Option<String> {
        let snapshot = self.versioning.snapshot.as_ref()?;
        let timestamp = snapshot.timestamp.as_deref()?;
        let build_number = snapshot.build_number?;
        let base = version.strip_suffix("SNAPSHOT")?;
        Some(format!("{base}{timestamp}-{build_number}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ARTIFACT_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <metadata>
          <groupId>org.example</groupId>
          <artifactId>demo</artifactId>
          <versioning>
            <latest>1.2.3</latest>
            <release>1.2.2</release>
            <versions>
              <version>1.0.0</version>
              <version>1.1.0</version>
              <version>1.2.2</version>
              <version>1.2.3</version>
            </versions>
            <lastUpdated>20250101010101</lastUpdated>
          </versioning>
        </metadata>
    "#;

    const SNAPSHOT_METADATA: &str = r#"<metadata modelVersion="1.1.0">
          <groupId>org.example</groupId>
          <artifactId>demo</artifactId>
          <version>1.0.0-SNAPSHOT</version>
          <versioning>
            <snapshot>
              <timestamp>20200101.120000</timestamp>
              <buildNumber>3</buildNumber>
            </snapshot>
            <lastUpdated>20200101120000</lastUpdated>
          </versioning>
        </metadata>
    "#;

    fn metadata(versions: &[&str]) -> VersionMetadata {
        VersionMetadata {
            versioning: Versioning {
                versions: Versions {
                    items: versions.iter().map(|v| v.to_string()).collect(),
                },
                ..Versioning::default()
            },
            ..VersionMetadata::default()
        }
    }

    fn sorted(metadata: &VersionMetadata) -> Vec<String> {
        let mut versions = metadata.versions().to_vec();
        versions.sort();
        versions
    }

    #[test]
    fn parse_reads_artifact_metadata() {
        let parsed = VersionMetadata::parse(ARTIFACT_METADATA.as_bytes()).unwrap();

        assert_eq!(parsed.group_id.as_deref(), Some("org.example"));
        assert_eq!(parsed.versions(), ["1.0.0", "1.1.0", "1.2.2", "1.2.3"]);
        assert_eq!(parsed.versioning.latest.as_deref(), Some("1.2.3"));
        assert_eq!(parsed.versioning.release.as_deref(), Some("1.2.2"));
        assert!(parsed.versioning.snapshot.is_none());
    }

    #[test]
    fn parse_reads_snapshot_entry() {
        let parsed = VersionMetadata::parse(SNAPSHOT_METADATA.as_bytes()).unwrap();

        assert_eq!(
            parsed.versioning.snapshot,
            Some(Snapshot {
                timestamp: Some("20200101.120000".to_string()),
                build_number: Some(3),
            })
        );
        assert!(parsed.versions().is_empty());
        assert!(!parsed.is_empty());
    }

    #[test]
    fn parse_rejects_truncated_document() {
        assert!(VersionMetadata::parse(b"<metadata><versioning>").is_err());
    }

    #[test]
    fn empty_is_identity() {
        let a = metadata(&["1.0", "2.0"]);

        assert_eq!(VersionMetadata::EMPTY.merge(a.clone()), a);
        assert_eq!(a.clone().merge(VersionMetadata::EMPTY), a);
        assert!(VersionMetadata::EMPTY.is_empty());
    }

    #[test]
    fn merge_concatenates_and_drops_snapshot() {
        let mut a = metadata(&["1.0"]);
        a.versioning.latest = Some("1.0".to_string());
        let b = metadata(&["2.0"]);

        let merged = a.merge(b);

        assert_eq!(merged.versions(), ["1.0", "2.0"]);
        assert_eq!(merged.versioning.latest, None);
    }

    #[rstest]
    #[case(&["1.0"], &["2.0"], &["3.0"])]
    #[case(&[], &["2.0"], &["3.0", "1.0"])]
    #[case(&["1.0", "1.1"], &[], &[])]
    fn merge_is_commutative_and_associative(
        #[case] a: &[&str],
        #[case] b: &[&str],
        #[case] c: &[&str],
    ) {
        let (a, b, c) = (metadata(a), metadata(b), metadata(c));

        let ab = a.clone().merge(b.clone());
        let ba = b.clone().merge(a.clone());
        assert_eq!(sorted(&ab), sorted(&ba));

        let left = ab.merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(sorted(&left), sorted(&right));
    }

    #[rstest]
    #[case("1.0.0-SNAPSHOT", Some("1.0.0-20200101.120000-3"))]
    #[case("2.1-SNAPSHOT", Some("2.1-20200101.120000-3"))]
    #[case("1.0.0", None)]
    fn dated_snapshot_version_replaces_suffix(#[case] version: &str, #[case] expected: Option<&str>) {
        let parsed = VersionMetadata::parse(SNAPSHOT_METADATA.as_bytes()).unwrap();

        assert_eq!(
            parsed.dated_snapshot_version(version).as_deref(),
            expected
        );
    }

    #[test]
    fn dated_snapshot_version_requires_snapshot_entry() {
        let parsed = VersionMetadata::parse(ARTIFACT_METADATA.as_bytes()).unwrap();
        assert_eq!(parsed.dated_snapshot_version("1.0.0-SNAPSHOT"), None);
    }
}
