use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maven Central, appended as the last candidate of every lookup
pub const SUPER_REPOSITORY_URL: &str = "https://repo.maven.apache.org/maven2";

/// Whether a repository serves a class of artifacts (releases or snapshots).
///
/// Only `enabled` affects resolution; the other settings are carried through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPolicy {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_policy: Option<String>,
}

impl ArtifactPolicy {
    pub const ENABLED: Self = Self::new(true);
    pub const DISABLED: Self = Self::new(false);

    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            update_policy: None,
            checksum_policy: None,
        }
    }
}

/// A remote artifact repository.
///
/// A missing policy means the artifact class is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<ArtifactPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<ArtifactPolicy>,
}

impl Repository {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            releases: None,
            snapshots: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_releases(mut self, policy: ArtifactPolicy) -> Self {
        self.releases = Some(policy);
        self
    }

    pub fn with_snapshots(mut self, policy: ArtifactPolicy) -> Self {
        self.snapshots = Some(policy);
        self
    }

    /// Maven Central: releases only
    pub fn super_repository() -> Self {
        Self::new(SUPER_REPOSITORY_URL)
            .with_id("central")
            .with_releases(ArtifactPolicy::ENABLED)
            .with_snapshots(ArtifactPolicy::DISABLED)
    }

    /// True if this repository serves the class of `version`
    /// (snapshot when it ends in `-SNAPSHOT`, release otherwise)
    pub fn accepts_version(&self, version: &str) -> bool {
        let policy = if version.ends_with("-SNAPSHOT") {
            &self.snapshots
        } else {
            &self.releases
        };
        policy.as_ref().is_none_or(|p| p.enabled)
    }

    /// The same repository with an `https` scheme, if its URL uses plain `http`
    pub fn with_secure_scheme(&self) -> Option<Self> {
        let scheme = self.url.get(..7)?;
        if !scheme.eq_ignore_ascii_case("http://") {
            return None;
        }
        Some(Self {
            url: format!("https://{}", &self.url[7..]),
            ..self.clone()
        })
    }

    /// Base URL without trailing slashes, ready to have paths appended
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn metadata_url(&self, group_id: &str, artifact_id: &str, version: Option<&str>) -> String {
        let mut url = format!("{}/{}/{}", self.base_url(), group_path(group_id), artifact_id);
        if let Some(version) = version {
            url.push('/');
            url.push_str(version);
        }
        url.push_str("/maven-metadata.xml");
        url
    }

    /// URL of a POM; `file_version` differs from `version` for dated snapshots
    pub fn pom_url(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        file_version: &str,
    ) -> String {
        format!(
            "{}/{}/{}/{}/{}-{}.pom",
            self.base_url(),
            group_path(group_id),
            artifact_id,
            version,
            artifact_id,
            file_version
        )
    }
}

fn group_path(group_id: &str) -> String {
    group_id.replace('.', "/")
}

/// `groupId:artifactId:version[:classifier]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT")
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

impl FromStr for Coordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("Invalid coordinate: {s}"));
        }
        match parts.as_slice() {
            [group_id, artifact_id, version] => Ok(Coordinate::new(*group_id, *artifact_id, *version)),
            [group_id, artifact_id, version, classifier] => {
                Ok(Coordinate::new(*group_id, *artifact_id, *version).with_classifier(*classifier))
            }
            _ => Err(format!(
                "Invalid coordinate: {s} (expected groupId:artifactId:version[:classifier])"
            )),
        }
    }
}
