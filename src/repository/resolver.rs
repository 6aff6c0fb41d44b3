//! Artifact metadata resolution across repositories
//!
//! Every candidate repository is queried concurrently and the results are
//! folded in repository order with [`VersionMetadata::merge`]. A repository
//! that fails or lacks the artifact contributes [`VersionMetadata::EMPTY`].

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::{Fetch, MavenCache};
use crate::error::FetchError;
use crate::repository::metadata::VersionMetadata;
use crate::repository::normalizer::RepositoryNormalizer;
use crate::repository::outcome::{AttemptKind, AttemptOutcome, DownloadOutcomes};
use crate::repository::transport::Transport;
use crate::repository::types::Repository;
use crate::version::{MavenVersion, VersionRequirement};

pub struct MetadataResolver {
    cache: Arc<dyn MavenCache>,
    transport: Arc<dyn Transport>,
    normalizer: RepositoryNormalizer,
    super_repository: Repository,
    outcomes: Arc<DownloadOutcomes>,
}

impl MetadataResolver {
    pub fn new(cache: Arc<dyn MavenCache>, transport: Arc<dyn Transport>) -> Self {
        Self {
            normalizer: RepositoryNormalizer::new(cache.clone(), transport.clone()),
            cache,
            transport,
            super_repository: Repository::super_repository(),
            outcomes: Arc::new(DownloadOutcomes::default()),
        }
    }

    pub fn with_super_repository(mut self, repository: Repository) -> Self {
        self.super_repository = repository;
        self
    }

    pub fn with_insecure_upgrade(mut self, upgrade: bool) -> Self {
        self.normalizer = self.normalizer.with_insecure_upgrade(upgrade);
        self
    }

    pub fn normalizer(&self) -> &RepositoryNormalizer {
        &self.normalizer
    }

    pub fn outcomes(&self) -> &Arc<DownloadOutcomes> {
        &self.outcomes
    }

    pub(crate) fn cache(&self) -> &dyn MavenCache {
        self.cache.as_ref()
    }

    /// Normalized repositories followed by the super repository
    pub async fn candidates(&self, repositories: &[Repository]) -> Vec<Repository> {
        let mut candidates = self.normalizer.normalize_all(repositories).await;
        candidates.push(self.super_repository.clone());
        candidates
    }

    /// Merged artifact metadata from every candidate repository. Never fails.
    pub async fn download_metadata(
        &self,
        group_id: &str,
        artifact_id: &str,
        repositories: &[Repository],
    ) -> VersionMetadata {
        let candidates = self.candidates(repositories).await;

        let results = join_all(
            candidates
                .iter()
                .map(|repository| self.cached_metadata(group_id, artifact_id, repository)),
        )
        .await;

        results
            .into_iter()
            .fold(VersionMetadata::EMPTY, VersionMetadata::merge)
    }

    async fn cached_metadata(
        &self,
        group_id: &str,
        artifact_id: &str,
        repository: &Repository,
    ) -> VersionMetadata {
        let started = Instant::now();
        let coordinate = format!("{}:{}", group_id, artifact_id);
        let fetch: Fetch<'_, VersionMetadata> =
            self.fetch_metadata(group_id, artifact_id, None, repository).boxed();

        match self
            .cache
            .compute_metadata(&repository.url, group_id, artifact_id, fetch)
            .await
        {
            Ok(result) => {
                self.outcomes.record(
                    AttemptKind::Metadata,
                    &coordinate,
                    result.state.into(),
                    started,
                );
                result.into_data().unwrap_or(VersionMetadata::EMPTY)
            }
            Err(e) => {
                debug!(
                    "Failed to resolve {} metadata from {}: {}",
                    coordinate, repository.url, e
                );
                self.outcomes
                    .record(AttemptKind::Metadata, &coordinate, AttemptOutcome::Error, started);
                VersionMetadata::EMPTY
            }
        }
    }

    /// Uncached metadata fetch from one repository.
    ///
    /// With a `version`, fetches version-level metadata (snapshot timestamps).
    pub async fn fetch_metadata(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: Option<&str>,
        repository: &Repository,
    ) -> Result<Option<VersionMetadata>, FetchError> {
        let url = repository.metadata_url(group_id, artifact_id, version);
        debug!("Fetching metadata {}", url);

        match self.transport.get(&url).await? {
            Some(body) => VersionMetadata::parse(&body).map(Some).inspect_err(|e| {
                warn!("Failed to parse metadata {}: {}", url, e);
            }),
            None => Ok(None),
        }
    }

    /// Concrete version for a requested one.
    ///
    /// `LATEST` and `RELEASE` use the metadata markers, falling back to the
    /// highest listed version (`RELEASE` skips snapshots). Ranges select the
    /// highest listed member. Any other version is returned as is.
    pub async fn resolve_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        requested: &str,
        repositories: &[Repository],
    ) -> Option<String> {
        let requested = requested.trim();
        let is_marker = matches!(requested, "LATEST" | "RELEASE");
        if !is_marker && !VersionRequirement::is_range(requested) {
            return Some(requested.to_string());
        }

        let metadata = self
            .download_metadata(group_id, artifact_id, repositories)
            .await;

        match requested {
            "LATEST" => metadata.versioning.latest.clone().or_else(|| {
                metadata
                    .versions()
                    .iter()
                    .map(|v| MavenVersion::parse(v))
                    .max()
                    .map(|v| v.to_string())
            }),
            "RELEASE" => metadata.versioning.release.clone().or_else(|| {
                metadata
                    .versions()
                    .iter()
                    .map(|v| MavenVersion::parse(v))
                    .filter(|v| !v.is_snapshot())
                    .max()
                    .map(|v| v.to_string())
            }),
            range => match VersionRequirement::parse(range) {
                Ok(requirement) => requirement.select(metadata.versions()),
                Err(e) => {
                    warn!("Invalid version range for {}:{}: {}", group_id, artifact_id, e);
                    None
                }
            },
        }
    }
}
