//! Shared test utilities
#![allow(dead_code)]

pub mod transport;

pub use transport::{FakeTransport, Request};

use std::sync::Arc;

use tempfile::TempDir;

use pom_resolver::cache::SqliteCache;

pub const CENTRAL: &str = "https://repo.maven.apache.org/maven2";

/// SQLite cache in a temporary directory; keep the `TempDir` alive
pub fn create_test_cache() -> (TempDir, Arc<SqliteCache>) {
    let temp_dir = TempDir::new().unwrap();
    let cache = SqliteCache::new(&temp_dir.path().join("test.db"), 86_400_000).unwrap();
    (temp_dir, Arc::new(cache))
}

pub fn metadata_xml(versions: &[&str]) -> String {
    let versions: String = versions
        .iter()
        .map(|v| format!("<version>{v}</version>"))
        .collect();
    format!("<metadata><versioning><versions>{versions}</versions></versioning></metadata>")
}

pub fn snapshot_metadata_xml(timestamp: &str, build_number: u32) -> String {
    format!(
        "<metadata><versioning><snapshot><timestamp>{timestamp}</timestamp><buildNumber>{build_number}</buildNumber></snapshot></versioning></metadata>"
    )
}

pub fn pom_xml(group_id: &str, artifact_id: &str, version: &str) -> String {
    format!(
        r#"<project>
    <modelVersion>4.0.0</modelVersion>
    <groupId>{group_id}</groupId>
    <artifactId>{artifact_id}</artifactId>
    <version>{version}</version>
</project>
"#
    )
}
