//! Three-outcome memoization of remote lookups
//!
//! Every expensive lookup (artifact metadata, POM documents, repository
//! normalization) goes through [`MavenCache`]. The caller hands over a
//! not-yet-started `fetch` future; the backend decides whether to await it.
//!
//! ```text
//! compute_*(key, fetch)
//!        │
//!        ├── fresh entry ───────────▶ Cached(value)
//!        ├── recorded as missing ───▶ Unavailable
//!        └── stale / unknown ──▶ fetch.await
//!                                  ├── Ok(Some(v)) ──▶ Updated(v)   (stored)
//!                                  ├── Ok(None) ─────▶ Unavailable  (stored)
//!                                  └── Err(e) ───────▶ CacheError::Fetch (not stored)
//! ```

pub mod noop;
pub mod sqlite;

use futures::future::BoxFuture;

use crate::error::{CacheError, FetchError};
use crate::pom::model::RawPom;
use crate::repository::metadata::VersionMetadata;
use crate::repository::types::Repository;

pub use noop::NoopCache;
pub use sqlite::SqliteCache;

/// Uncached computation handed to a cache backend, awaited at most once
pub type Fetch<'a, T> = BoxFuture<'a, Result<Option<T>, FetchError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Found without doing any work
    Cached,
    /// Computed now and stored
    Updated,
    /// Computation yielded nothing; recorded to avoid repeated attempts
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
    pub state: CacheState,
    pub data: Option<T>,
}

impl<T> CacheResult<T> {
    pub fn cached(data: T) -> Self {
        Self {
            state: CacheState::Cached,
            data: Some(data),
        }
    }

    pub fn updated(data: T) -> Self {
        Self {
            state: CacheState::Updated,
            data: Some(data),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            state: CacheState::Unavailable,
            data: None,
        }
    }

    /// `Updated` for a value, `Unavailable` for nothing
    pub fn computed(data: Option<T>) -> Self {
        match data {
            Some(data) => Self::updated(data),
            None => Self::unavailable(),
        }
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// Kind of cached entry; part of every cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Metadata,
    Pom,
    Repository,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Metadata => "metadata",
            EntryKind::Pom => "pom",
            EntryKind::Repository => "repository",
        }
    }
}

/// Cache backend shared by the normalizer, resolver and downloader.
///
/// A fetch error surfaces as [`CacheError::Fetch`] and is never recorded, so
/// the next call for the same key retries.
#[async_trait::async_trait]
pub trait MavenCache: Send + Sync {
    async fn compute_metadata(
        &self,
        repository_url: &str,
        group_id: &str,
        artifact_id: &str,
        fetch: Fetch<'_, VersionMetadata>,
    ) -> Result<CacheResult<VersionMetadata>, CacheError>;

    async fn compute_pom(
        &self,
        repository_url: &str,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        fetch: Fetch<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>, CacheError>;

    async fn compute_repository(
        &self,
        repository: &Repository,
        fetch: Fetch<'_, Repository>,
    ) -> Result<CacheResult<Repository>, CacheError>;
}

pub(crate) fn metadata_key(repository_url: &str, group_id: &str, artifact_id: &str) -> String {
    format!("{repository_url}|{group_id}:{artifact_id}")
}

pub(crate) fn pom_key(
    repository_url: &str,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> String {
    format!("{repository_url}|{group_id}:{artifact_id}:{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_maps_absence_to_unavailable() {
        let found = CacheResult::computed(Some(1));
        let missing: CacheResult<i32> = CacheResult::computed(None);

        assert_eq!(found.state, CacheState::Updated);
        assert_eq!(found.into_data(), Some(1));
        assert_eq!(missing.state, CacheState::Unavailable);
        assert_eq!(missing.into_data(), None);
    }

    #[test]
    fn keys_separate_repositories() {
        assert_ne!(
            metadata_key("https://a.example.com", "org.example", "lib"),
            metadata_key("https://b.example.com", "org.example", "lib")
        );
        assert_ne!(
            pom_key("https://a.example.com", "org.example", "lib", "1.0"),
            pom_key("https://a.example.com", "org.example", "lib", "1.1")
        );
    }
}
