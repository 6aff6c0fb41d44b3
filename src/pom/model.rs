//! POM document model and its effective projection
//!
//! [`PomModel`] is a direct deserialization of `pom.xml`: every field is
//! optional and list order is preserved. [`RawPom`] pairs a model with where
//! it came from; its accessors compute the effective view (parent fallback,
//! property interpolation, dependency management, active profiles).

use std::path::PathBuf;
use std::sync::OnceLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::repository::types::{ArtifactPolicy, Repository};

/// Passes of `${...}` substitution; bounds self-referencing properties
const MAX_INTERPOLATION_PASSES: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<PomParent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub dependency_management: DependencyManagement,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub repositories: Repositories,
    #[serde(default)]
    pub profiles: Profiles,
    #[serde(default)]
    pub modules: Modules,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomParent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub dependency_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default, rename = "dependency")]
    pub items: Vec<PomDependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManagement {
    #[serde(default)]
    pub dependencies: Dependencies,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomRepositoryPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomRepository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<PomRepositoryPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<PomRepositoryPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repositories {
    #[serde(default, rename = "repository")]
    pub items: Vec<PomRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_by_default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub dependency_management: DependencyManagement,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub repositories: Repositories,
}

impl Profile {
    pub fn is_active_by_default(&self) -> bool {
        self.activation
            .as_ref()
            .and_then(|a| a.active_by_default.as_deref())
            .is_some_and(|v| v.trim() == "true")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profiles {
    #[serde(default, rename = "profile")]
    pub items: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modules {
    #[serde(default, rename = "module")]
    pub items: Vec<String>,
}

/// Where a POM was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomSource {
    Local(PathBuf),
    Remote(String),
}

/// Dependency after interpolation and management
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub dependency_type: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
}

/// A parsed POM and its origin. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPom {
    pub source: PomSource,
    /// Dated file version when this POM was downloaded for a `-SNAPSHOT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dated_snapshot_version: Option<String>,
    pub model: PomModel,
}

impl RawPom {
    pub fn parse(
        bytes: &[u8],
        source: PomSource,
        dated_snapshot_version: Option<String>,
    ) -> Result<Self, quick_xml::DeError> {
        let model: PomModel = quick_xml::de::from_reader(bytes)?;
        Ok(Self {
            source,
            dated_snapshot_version,
            model,
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.source, PomSource::Remote(_))
    }

    pub fn group_id(&self) -> Option<&str> {
        self.model
            .group_id
            .as_deref()
            .or_else(|| self.model.parent.as_ref()?.group_id.as_deref())
    }

    pub fn artifact_id(&self) -> Option<&str> {
        self.model.artifact_id.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.model
            .version
            .as_deref()
            .or_else(|| self.model.parent.as_ref()?.version.as_deref())
    }

    pub fn active_profiles(&self) -> impl Iterator<Item = &Profile> {
        self.model
            .profiles
            .items
            .iter()
            .filter(|p| p.is_active_by_default())
    }

    /// Declared properties, then active profile properties, then `project.*` / `pom.*`
    pub fn properties(&self) -> IndexMap<String, String> {
        let mut properties = self.model.properties.clone();
        for profile in self.active_profiles() {
            properties.extend(profile.properties.clone());
        }

        let builtins = [
            ("groupId", self.group_id()),
            ("artifactId", self.artifact_id()),
            ("version", self.version()),
        ];
        for (name, value) in builtins {
            if let Some(value) = value {
                properties.insert(format!("project.{name}"), value.to_string());
                properties.insert(format!("pom.{name}"), value.to_string());
            }
        }
        properties
    }

    /// Replace `${key}` placeholders; unknown keys are left as written
    pub fn interpolate(&self, text: &str) -> String {
        resolve_placeholders(text, &self.properties())
    }

    /// Version declared for `(group_id, artifact_id)` in project or
    /// active-profile `<dependencyManagement>`, interpolated
    pub fn managed_version(&self, group_id: &str, artifact_id: &str) -> Option<String> {
        let properties = self.properties();
        let resolve = |value: Option<&str>| value.map(|v| resolve_placeholders(v, &properties));

        self.managed_dependencies()
            .find(|dep| {
                resolve(dep.group_id.as_deref()).as_deref() == Some(group_id)
                    && resolve(dep.artifact_id.as_deref()).as_deref() == Some(artifact_id)
            })
            .and_then(|dep| resolve(dep.version.as_deref()))
    }

    fn managed_dependencies(&self) -> impl Iterator<Item = &PomDependency> {
        self.model
            .dependency_management
            .dependencies
            .items
            .iter()
            .chain(
                self.active_profiles()
                    .flat_map(|p| p.dependency_management.dependencies.items.iter()),
            )
    }

    /// Project and active-profile dependencies, interpolated, with managed
    /// versions filled in where the declaration has none
    pub fn active_dependencies(&self) -> Vec<Dependency> {
        let properties = self.properties();
        let resolve = |value: &Option<String>| {
            value
                .as_deref()
                .map(|v| resolve_placeholders(v, &properties))
        };

        self.model
            .dependencies
            .items
            .iter()
            .chain(self.active_profiles().flat_map(|p| p.dependencies.items.iter()))
            .map(|dep| {
                let group_id = resolve(&dep.group_id).unwrap_or_default();
                let artifact_id = resolve(&dep.artifact_id).unwrap_or_default();
                let version = resolve(&dep.version)
                    .or_else(|| self.managed_version(&group_id, &artifact_id));
                Dependency {
                    version,
                    classifier: resolve(&dep.classifier),
                    dependency_type: resolve(&dep.dependency_type),
                    scope: resolve(&dep.scope),
                    optional: resolve(&dep.optional).is_some_and(|o| o.trim() == "true"),
                    group_id,
                    artifact_id,
                }
            })
            .collect()
    }

    /// Project and active-profile repositories, interpolated and deduplicated
    pub fn active_repositories(&self) -> Vec<Repository> {
        let properties = self.properties();
        let policy = |policy: &Option<PomRepositoryPolicy>| {
            policy.as_ref().map(|p| ArtifactPolicy {
                enabled: p
                    .enabled
                    .as_deref()
                    .map(|e| resolve_placeholders(e, &properties))
                    .is_none_or(|e| e.trim() != "false"),
                update_policy: p.update_policy.clone(),
                checksum_policy: p.checksum_policy.clone(),
            })
        };

        let repositories: IndexSet<Repository> = self
            .model
            .repositories
            .items
            .iter()
            .chain(self.active_profiles().flat_map(|p| p.repositories.items.iter()))
            .filter_map(|repo| {
                let url = resolve_placeholders(repo.url.as_deref()?.trim(), &properties);
                Some(Repository {
                    id: repo.id.clone(),
                    url,
                    releases: policy(&repo.releases),
                    snapshots: policy(&repo.snapshots),
                })
            })
            .collect();

        repositories.into_iter().collect()
    }
}

fn resolve_placeholders(text: &str, properties: &IndexMap<String, String>) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

    let mut current = text.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        let next = re
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                properties
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}
