//! Repository normalization: secure-scheme upgrade and reachability probe

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexSet;
use tracing::debug;

use crate::cache::{Fetch, MavenCache};
use crate::repository::transport::Transport;
use crate::repository::types::Repository;

pub struct RepositoryNormalizer {
    cache: Arc<dyn MavenCache>,
    transport: Arc<dyn Transport>,
    upgrade_insecure: bool,
}

impl RepositoryNormalizer {
    pub fn new(cache: Arc<dyn MavenCache>, transport: Arc<dyn Transport>) -> Self {
        Self {
            cache,
            transport,
            upgrade_insecure: true,
        }
    }

    /// Whether `http://` repositories are rewritten to `https://` before probing
    pub fn with_insecure_upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade_insecure = upgrade;
        self
    }

    /// The usable form of `repository`, or `None` when it cannot be reached.
    ///
    /// The outcome is cached per repository, including unreachability. A
    /// plain-http repository is replaced by its https form without probing
    /// the http URL. There is no retry.
    pub fn normalize<'a>(&'a self, repository: &'a Repository) -> BoxFuture<'a, Option<Repository>> {
        self.normalize_inner(repository, self.upgrade_insecure)
    }

    fn normalize_inner<'a>(
        &'a self,
        repository: &'a Repository,
        allow_upgrade: bool,
    ) -> BoxFuture<'a, Option<Repository>> {
        async move {
            let fetch: Fetch<'_, Repository> = async move {
                if allow_upgrade && let Some(secure) = repository.with_secure_scheme() {
                    debug!("Upgrading {} to {}", repository.url, secure.url);
                    return Ok(self.normalize_inner(&secure, false).await);
                }
                Ok(self.probe(repository).await)
            }
            .boxed();

            match self.cache.compute_repository(repository, fetch).await {
                Ok(result) => result.into_data(),
                Err(e) => {
                    debug!("Failed to normalize repository {}: {}", repository.url, e);
                    None
                }
            }
        }
        .boxed()
    }

    async fn probe(&self, repository: &Repository) -> Option<Repository> {
        match self.transport.head(&repository.url).await {
            Ok(true) => Some(repository.clone()),
            Ok(false) => {
                debug!("Repository {} did not answer the probe", repository.url);
                None
            }
            Err(e) => {
                debug!("Repository {} is unreachable: {}", repository.url, e);
                None
            }
        }
    }

    /// Deduplicate, normalize in order, and drop unreachable repositories
    pub async fn normalize_all(&self, repositories: &[Repository]) -> Vec<Repository> {
        let distinct: IndexSet<&Repository> = repositories.iter().collect();
        let mut normalized = Vec::with_capacity(distinct.len());
        for repository in distinct {
            if let Some(repository) = self.normalize(repository).await {
                normalized.push(repository);
            }
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoopCache, SqliteCache};
    use crate::repository::transport::MockTransport;

    fn normalizer(transport: MockTransport) -> RepositoryNormalizer {
        RepositoryNormalizer::new(Arc::new(NoopCache), Arc::new(transport))
    }

    #[tokio::test]
    async fn reachable_repository_is_returned_unchanged() {
        let mut transport = MockTransport::new();
        transport
            .expect_head()
            .withf(|url| url == "https://repo.example.com/maven2")
            .times(1)
            .returning(|_| Ok(true));

        let repository = Repository::new("https://repo.example.com/maven2").with_id("example");
        let normalized = normalizer(transport).normalize(&repository).await;

        assert_eq!(normalized, Some(repository));
    }

    #[tokio::test]
    async fn unreachable_repository_is_dropped() {
        let mut transport = MockTransport::new();
        transport.expect_head().times(1).returning(|_| Ok(false));

        let repository = Repository::new("https://down.example.com/maven2");

        assert_eq!(normalizer(transport).normalize(&repository).await, None);
    }

    #[tokio::test]
    async fn http_repository_is_upgraded_without_probing_http() {
        let mut transport = MockTransport::new();
        transport
            .expect_head()
            .withf(|url| url == "https://repo.example.com/maven2")
            .times(1)
            .returning(|_| Ok(true));

        let repository = Repository::new("http://repo.example.com/maven2").with_id("example");
        let normalized = normalizer(transport).normalize(&repository).await.unwrap();

        assert_eq!(normalized.url, "https://repo.example.com/maven2");
        assert_eq!(normalized.id.as_deref(), Some("example"));
    }

    #[tokio::test]
    async fn upper_case_http_scheme_is_upgraded() {
        let mut transport = MockTransport::new();
        transport
            .expect_head()
            .withf(|url| url == "https://repo.example.com/maven2")
            .times(1)
            .returning(|_| Ok(true));

        let repository = Repository::new("HTTP://repo.example.com/maven2");
        let normalized = normalizer(transport).normalize(&repository).await.unwrap();

        assert_eq!(normalized.url, "https://repo.example.com/maven2");
    }

    #[tokio::test]
    async fn upgrade_can_be_disabled() {
        let mut transport = MockTransport::new();
        transport
            .expect_head()
            .withf(|url| url == "http://localhost:8081/maven2")
            .times(1)
            .returning(|_| Ok(true));

        let repository = Repository::new("http://localhost:8081/maven2");
        let normalized = normalizer(transport)
            .with_insecure_upgrade(false)
            .normalize(&repository)
            .await;

        assert_eq!(normalized, Some(repository));
    }

    #[tokio::test]
    async fn unreachable_outcome_is_cached() {
        let mut transport = MockTransport::new();
        transport.expect_head().times(1).returning(|_| Ok(false));

        let cache = Arc::new(SqliteCache::open_in_memory(86_400_000).unwrap());
        let normalizer = RepositoryNormalizer::new(cache, Arc::new(transport));
        let repository = Repository::new("https://down.example.com/maven2");

        assert_eq!(normalizer.normalize(&repository).await, None);
        assert_eq!(normalizer.normalize(&repository).await, None);
    }

    #[tokio::test]
    async fn normalize_all_dedups_and_keeps_order() {
        let mut transport = MockTransport::new();
        transport
            .expect_head()
            .withf(|url| url == "https://a.example.com")
            .times(1)
            .returning(|_| Ok(true));
        transport
            .expect_head()
            .withf(|url| url == "https://b.example.com")
            .times(1)
            .returning(|_| Ok(false));
        transport
            .expect_head()
            .withf(|url| url == "https://c.example.com")
            .times(1)
            .returning(|_| Ok(true));

        let repositories = vec![
            Repository::new("https://a.example.com"),
            Repository::new("https://b.example.com"),
            Repository::new("https://a.example.com"),
            Repository::new("https://c.example.com"),
        ];
        let normalized = normalizer(transport).normalize_all(&repositories).await;

        let urls: Vec<&str> = normalized.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example.com", "https://c.example.com"]);
    }
}
