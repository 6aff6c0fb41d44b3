use crate::cache::{CacheResult, Fetch, MavenCache};
use crate::error::CacheError;
use crate::pom::model::RawPom;
use crate::repository::metadata::VersionMetadata;
use crate::repository::types::Repository;

/// Cache that stores nothing and always runs the fetch
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait::async_trait]
impl MavenCache for NoopCache {
    async fn compute_metadata(
        &self,
        _repository_url: &str,
        _group_id: &str,
        _artifact_id: &str,
        fetch: Fetch<'_, VersionMetadata>,
    ) -> Result<CacheResult<VersionMetadata>, CacheError> {
        Ok(CacheResult::computed(fetch.await?))
    }

    async fn compute_pom(
        &self,
        _repository_url: &str,
        _group_id: &str,
        _artifact_id: &str,
        _version: &str,
        fetch: Fetch<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>, CacheError> {
        Ok(CacheResult::computed(fetch.await?))
    }

    async fn compute_repository(
        &self,
        _repository: &Repository,
        fetch: Fetch<'_, Repository>,
    ) -> Result<CacheResult<Repository>, CacheError> {
        Ok(CacheResult::computed(fetch.await?))
    }
}
