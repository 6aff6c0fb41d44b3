use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::repository::types::Repository;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default refresh interval in milliseconds (24 hours)
pub const DEFAULT_REFRESH_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolver configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    pub cache: CacheConfig,
    /// Repositories consulted before the super repository, in order
    pub repositories: Vec<Repository>,
    /// Replaces Maven Central as the last-resort repository
    pub super_repository: Option<Repository>,
    pub upgrade_insecure_repositories: bool,
    pub fetch_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            repositories: Vec::new(),
            super_repository: None,
            upgrade_insecure_repositories: true,
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

impl ResolverConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn super_repository(&self) -> Repository {
        self.super_repository
            .clone()
            .unwrap_or_else(Repository::super_repository)
    }
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Persist lookups in SQLite; otherwise every lookup hits the network
    pub enabled: bool,
    /// Cache refresh interval in milliseconds
    pub refresh_interval: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

/// Returns the path to the data directory for pom-resolver.
/// Uses $XDG_DATA_HOME/pom-resolver if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/pom-resolver,
/// or ./pom-resolver if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("maven-cache.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("pom-resolver.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("pom-resolver")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::types::ArtifactPolicy;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn resolver_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<ResolverConfig>(json!({
            "cache": {
                "refreshInterval": 1000
            }
        }))
        .unwrap();

        assert_eq!(result.cache.refresh_interval, 1000);
        assert!(result.cache.enabled);
        assert!(result.repositories.is_empty());
        assert!(result.upgrade_insecure_repositories);
        assert_eq!(result.fetch_timeout_ms, FETCH_TIMEOUT_MS);
        assert_eq!(result.super_repository(), Repository::super_repository());
    }

    #[test]
    fn resolver_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<ResolverConfig>(json!({
            "cache": {
                "enabled": false,
                "refreshInterval": 5000
            },
            "repositories": [
                {
                    "id": "internal",
                    "url": "https://repo.example.com/maven2",
                    "snapshots": { "enabled": false }
                }
            ],
            "superRepository": { "url": "https://mirror.example.com/maven2" },
            "upgradeInsecureRepositories": false,
            "fetchTimeoutMs": 1500
        }))
        .unwrap();

        assert_eq!(
            result,
            ResolverConfig {
                cache: CacheConfig {
                    enabled: false,
                    refresh_interval: 5000
                },
                repositories: vec![
                    Repository::new("https://repo.example.com/maven2")
                        .with_id("internal")
                        .with_snapshots(ArtifactPolicy::DISABLED)
                ],
                super_repository: Some(Repository::new("https://mirror.example.com/maven2")),
                upgrade_insecure_repositories: false,
                fetch_timeout_ms: 1500,
            }
        );
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fetchTimeoutMs": 10}}"#).unwrap();

        let config = ResolverConfig::load(file.path()).unwrap();

        assert_eq!(config.fetch_timeout_ms, 10);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ResolverConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));

        let malformed = dir.path().join("malformed.json");
        std::fs::write(&malformed, "{ not json").unwrap();
        assert!(matches!(
            ResolverConfig::load(&malformed),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/pom-resolver"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/pom-resolver"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./pom-resolver"));
    }
}
