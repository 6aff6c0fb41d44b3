//! POM download
//!
//! ```text
//! download(request)
//!   │
//!   ├─ project POMs (relativePath, then groupId:artifactId) ──▶ hit: no network
//!   │
//!   ├─ -SNAPSHOT? ── version metadata ──▶ 1.0-20200101.120000-3  (or give up)
//!   │
//!   └─ for repo in normalized repositories + super repository:
//!          skip if the policy rejects the version
//!          compute_pom(repo, ...) ──▶ first Some wins
//! ```
//!
//! Unlike metadata, which is merged across every repository, a POM comes from
//! exactly one repository and later repositories are never asked once one
//! has answered.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::cache::{Fetch, MavenCache};
use crate::error::FetchError;
use crate::pom::model::{PomSource, RawPom};
use crate::repository::metadata::VersionMetadata;
use crate::repository::outcome::{AttemptKind, AttemptOutcome, DownloadOutcomes};
use crate::repository::resolver::MetadataResolver;
use crate::repository::transport::Transport;
use crate::repository::types::{Coordinate, Repository};

/// One POM lookup
#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    pub coordinate: Coordinate,
    /// `<relativePath>` of a `<parent>` declaration, relative to `containing_pom`
    pub relative_path: Option<&'a str>,
    /// POM that declared the coordinate, if any
    pub containing_pom: Option<&'a RawPom>,
    pub repositories: &'a [Repository],
}

impl<'a> DownloadRequest<'a> {
    pub fn new(coordinate: Coordinate, repositories: &'a [Repository]) -> Self {
        Self {
            coordinate,
            relative_path: None,
            containing_pom: None,
            repositories,
        }
    }

    pub fn declared_in(mut self, containing_pom: &'a RawPom) -> Self {
        self.containing_pom = Some(containing_pom);
        self
    }

    pub fn with_relative_path(mut self, relative_path: &'a str) -> Self {
        self.relative_path = Some(relative_path);
        self
    }
}

pub struct MavenDownloader {
    resolver: MetadataResolver,
    transport: Arc<dyn Transport>,
    project_poms: IndexMap<PathBuf, RawPom>,
}

impl MavenDownloader {
    pub fn new(cache: Arc<dyn MavenCache>, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver: MetadataResolver::new(cache, transport.clone()),
            transport,
            project_poms: IndexMap::new(),
        }
    }

    /// POMs of the local build; only `PomSource::Local` ones are kept
    pub fn with_project_poms(mut self, poms: impl IntoIterator<Item = RawPom>) -> Self {
        for pom in poms {
            let path = match &pom.source {
                PomSource::Local(path) => normalize_path(path),
                PomSource::Remote(_) => continue,
            };
            self.project_poms.insert(path, pom);
        }
        self
    }

    pub fn with_super_repository(mut self, repository: Repository) -> Self {
        self.resolver = self.resolver.with_super_repository(repository);
        self
    }

    pub fn with_insecure_upgrade(mut self, upgrade: bool) -> Self {
        self.resolver = self.resolver.with_insecure_upgrade(upgrade);
        self
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    pub fn outcomes(&self) -> &Arc<DownloadOutcomes> {
        self.resolver.outcomes()
    }

    pub async fn download_metadata(
        &self,
        group_id: &str,
        artifact_id: &str,
        repositories: &[Repository],
    ) -> VersionMetadata {
        self.resolver
            .download_metadata(group_id, artifact_id, repositories)
            .await
    }

    /// The POM for `request.coordinate`, or `None` when no project POM and
    /// no repository has it
    pub async fn download(&self, request: DownloadRequest<'_>) -> Option<RawPom> {
        if let Some(pom) = self.find_project_pom(&request) {
            debug!("Using project POM for {}", request.coordinate);
            return Some(pom.clone());
        }

        let coordinate = &request.coordinate;
        let file_version = self
            .file_version(coordinate, request.repositories)
            .await?;

        let candidates = self.resolver.candidates(request.repositories).await;
        for repository in candidates
            .iter()
            .filter(|repository| repository.accepts_version(&coordinate.version))
        {
            if let Some(pom) = self.cached_pom(coordinate, &file_version, repository).await {
                return Some(pom);
            }
        }

        debug!("No repository has {}", coordinate);
        None
    }

    fn find_project_pom(&self, request: &DownloadRequest<'_>) -> Option<&RawPom> {
        if request.containing_pom.is_some_and(RawPom::is_remote) {
            return None;
        }

        if let Some(relative_path) = request.relative_path.filter(|p| !p.trim().is_empty())
            && let Some(PomSource::Local(containing)) = request.containing_pom.map(|p| &p.source)
        {
            let path = relative_pom_path(containing, relative_path.trim());
            if let Some(pom) = self.project_poms.get(&path) {
                return Some(pom);
            }
        }

        let coordinate = &request.coordinate;
        self.project_poms.values().find(|pom| {
            pom.group_id() == Some(coordinate.group_id.as_str())
                && pom.artifact_id() == Some(coordinate.artifact_id.as_str())
        })
    }

    /// Version used in the POM file name: the dated form for snapshots
    async fn file_version(
        &self,
        coordinate: &Coordinate,
        repositories: &[Repository],
    ) -> Option<String> {
        if !coordinate.is_snapshot() {
            return Some(coordinate.version.clone());
        }

        let label = coordinate.to_string();
        let normalized = self.resolver.normalizer().normalize_all(repositories).await;
        for repository in normalized
            .iter()
            .filter(|repository| repository.accepts_version(&coordinate.version))
        {
            let started = Instant::now();
            let result = self
                .resolver
                .fetch_metadata(
                    &coordinate.group_id,
                    &coordinate.artifact_id,
                    Some(&coordinate.version),
                    repository,
                )
                .await;

            match result {
                Ok(Some(metadata)) => {
                    self.outcomes()
                        .record(AttemptKind::Metadata, &label, AttemptOutcome::Downloaded, started);
                    let dated = metadata.dated_snapshot_version(&coordinate.version);
                    if dated.is_none() {
                        debug!("No snapshot entry for {} in {}", label, repository.url);
                    }
                    return dated;
                }
                Ok(None) => {
                    self.outcomes()
                        .record(AttemptKind::Metadata, &label, AttemptOutcome::Unavailable, started);
                }
                Err(e) => {
                    debug!("Failed to fetch snapshot metadata for {} from {}: {}", label, repository.url, e);
                    self.outcomes()
                        .record(AttemptKind::Metadata, &label, AttemptOutcome::Error, started);
                }
            }
        }

        debug!("No snapshot metadata for {}", label);
        None
    }

    async fn cached_pom(
        &self,
        coordinate: &Coordinate,
        file_version: &str,
        repository: &Repository,
    ) -> Option<RawPom> {
        let started = Instant::now();
        let label = coordinate.to_string();
        let fetch: Fetch<'_, RawPom> = self
            .fetch_pom(coordinate, file_version, repository)
            .boxed();

        let result = self
            .resolver
            .cache()
            .compute_pom(
                &repository.url,
                &coordinate.group_id,
                &coordinate.artifact_id,
                file_version,
                fetch,
            )
            .await;

        match result {
            Ok(result) => {
                self.outcomes()
                    .record(AttemptKind::Pom, &label, result.state.into(), started);
                result.into_data()
            }
            Err(e) => {
                debug!("Failed to download {} from {}: {}", label, repository.url, e);
                self.outcomes()
                    .record(AttemptKind::Pom, &label, AttemptOutcome::Error, started);
                None
            }
        }
    }

    async fn fetch_pom(
        &self,
        coordinate: &Coordinate,
        file_version: &str,
        repository: &Repository,
    ) -> Result<Option<RawPom>, FetchError> {
        let url = repository.pom_url(
            &coordinate.group_id,
            &coordinate.artifact_id,
            &coordinate.version,
            file_version,
        );
        debug!("Fetching POM {}", url);

        let Some(body) = self.transport.get(&url).await? else {
            return Ok(None);
        };
        let dated = (file_version != coordinate.version).then(|| file_version.to_string());
        RawPom::parse(&body, PomSource::Remote(url.clone()), dated)
            .map(Some)
            .map_err(|e| {
                warn!("Failed to parse POM {}: {}", url, e);
                FetchError::Xml(e)
            })
    }
}

/// `relative_path` resolved against the directory of `containing`; a
/// directory reference gets `pom.xml` appended
fn relative_pom_path(containing: &Path, relative_path: &str) -> PathBuf {
    let directory = containing.parent().unwrap_or_else(|| Path::new(""));
    let mut path = directory.join(relative_path);
    if path.extension().is_none_or(|ext| ext != "xml") {
        path.push("pom.xml");
    }
    normalize_path(&path)
}

/// Lexical `.`/`..` folding; the filesystem is never consulted
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoopCache, SqliteCache};
    use crate::repository::transport::MockTransport;
    use crate::repository::types::ArtifactPolicy;
    use rstest::rstest;

    const CENTRAL: &str = "https://repo.maven.apache.org/maven2";
    const INTERNAL: &str = "https://repo.example.com/maven2";

    fn pom_xml(group_id: &str, artifact_id: &str, version: &str) -> Vec<u8> {
        format!(
            "<project><groupId>{group_id}</groupId><artifactId>{artifact_id}</artifactId><version>{version}</version></project>"
        )
        .into_bytes()
    }

    fn local_pom(path: &str, group_id: &str, artifact_id: &str) -> RawPom {
        RawPom::parse(
            &pom_xml(group_id, artifact_id, "1.0"),
            PomSource::Local(PathBuf::from(path)),
            None,
        )
        .unwrap()
    }

    #[rstest]
    #[case("/work/app/pom.xml", "../parent", "/work/parent/pom.xml")]
    #[case("/work/app/pom.xml", "../parent/custom.xml", "/work/parent/custom.xml")]
    #[case("/work/app/pom.xml", "./", "/work/app/pom.xml")]
    #[case("/work/a/b/pom.xml", "../../root", "/work/root/pom.xml")]
    fn relative_pom_path_is_normalized(
        #[case] containing: &str,
        #[case] relative: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(
            relative_pom_path(Path::new(containing), relative),
            PathBuf::from(expected)
        );
    }

    #[tokio::test]
    async fn relative_path_finds_project_pom_without_network() {
        let transport = MockTransport::new();
        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport))
            .with_project_poms([
                local_pom("/work/parent/pom.xml", "org.example", "parent"),
                local_pom("/work/app/pom.xml", "org.example", "app"),
            ]);
        let app = local_pom("/work/app/pom.xml", "org.example", "app");

        let request = DownloadRequest::new(Coordinate::new("org.example", "renamed", "1.0"), &[])
            .declared_in(&app)
            .with_relative_path("../parent");
        let pom = downloader.download(request).await.unwrap();

        assert_eq!(pom.artifact_id(), Some("parent"));
    }

    #[tokio::test]
    async fn project_pom_matched_by_coordinates_without_network() {
        let transport = MockTransport::new();
        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport))
            .with_project_poms([local_pom("/work/core/pom.xml", "org.example", "core")]);
        let repositories = [Repository::new(INTERNAL)];

        let request =
            DownloadRequest::new(Coordinate::new("org.example", "core", "1.0"), &repositories);
        let pom = downloader.download(request).await.unwrap();

        assert_eq!(pom.source, PomSource::Local(PathBuf::from("/work/core/pom.xml")));
    }

    #[tokio::test]
    async fn remote_containing_pom_skips_project_poms() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url| url == "https://repo.maven.apache.org/maven2/org/example/core/1.0/core-1.0.pom")
            .times(1)
            .returning(|_| Ok(Some(pom_xml("org.example", "core", "1.0"))));
        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport))
            .with_project_poms([local_pom("/work/core/pom.xml", "org.example", "core")]);
        let remote = RawPom::parse(
            &pom_xml("org.example", "consumer", "1.0"),
            PomSource::Remote(format!("{CENTRAL}/org/example/consumer/1.0/consumer-1.0.pom")),
            None,
        )
        .unwrap();

        let request = DownloadRequest::new(Coordinate::new("org.example", "core", "1.0"), &[])
            .declared_in(&remote);
        let pom = downloader.download(request).await.unwrap();

        assert!(pom.is_remote());
    }

    #[tokio::test]
    async fn first_repository_with_the_pom_wins() {
        let mut transport = MockTransport::new();
        transport.expect_head().returning(|_| Ok(true));
        transport
            .expect_get()
            .withf(|url| url.starts_with("https://first.example.com"))
            .times(1)
            .returning(|_| Ok(None));
        transport
            .expect_get()
            .withf(|url| url.starts_with("https://second.example.com"))
            .times(1)
            .returning(|_| Ok(Some(pom_xml("org.example", "lib", "2.0"))));

        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport));
        let repositories = [
            Repository::new("https://first.example.com"),
            Repository::new("https://second.example.com"),
        ];
        let request =
            DownloadRequest::new(Coordinate::new("org.example", "lib", "2.0"), &repositories);
        let pom = downloader.download(request).await.unwrap();

        assert_eq!(
            pom.source,
            PomSource::Remote("https://second.example.com/org/example/lib/2.0/lib-2.0.pom".to_string())
        );
        assert_eq!(pom.dated_snapshot_version, None);
        let outcomes = downloader.outcomes();
        assert_eq!(outcomes.count(AttemptKind::Pom, AttemptOutcome::Unavailable), 1);
        assert_eq!(outcomes.count(AttemptKind::Pom, AttemptOutcome::Downloaded), 1);
    }

    #[tokio::test]
    async fn failing_repository_falls_through_to_the_next() {
        let mut transport = MockTransport::new();
        transport.expect_head().returning(|_| Ok(true));
        transport
            .expect_get()
            .withf(|url| url.starts_with(INTERNAL))
            .returning(|_| Err(FetchError::InvalidResponse("reset".to_string())));
        transport
            .expect_get()
            .withf(|url| url.starts_with(CENTRAL))
            .returning(|_| Ok(Some(b"<project><artifactId>".to_vec())));

        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport));
        let repositories = [Repository::new(INTERNAL)];
        let request =
            DownloadRequest::new(Coordinate::new("org.example", "lib", "2.0"), &repositories);

        assert_eq!(downloader.download(request).await, None);
        assert_eq!(downloader.outcomes().count(AttemptKind::Pom, AttemptOutcome::Error), 2);
    }

    #[tokio::test]
    async fn snapshot_is_downloaded_under_dated_name() {
        let mut transport = MockTransport::new();
        transport.expect_head().returning(|_| Ok(true));
        transport
            .expect_get()
            .withf(|url| url == "https://repo.example.com/maven2/org/example/lib/1.0.0-SNAPSHOT/maven-metadata.xml")
            .times(1)
            .returning(|_| {
                Ok(Some(
                    b"<metadata><versioning><snapshot><timestamp>20200101.120000</timestamp><buildNumber>3</buildNumber></snapshot></versioning></metadata>"
                        .to_vec(),
                ))
            });
        transport
            .expect_get()
            .withf(|url| {
                url == "https://repo.example.com/maven2/org/example/lib/1.0.0-SNAPSHOT/lib-1.0.0-20200101.120000-3.pom"
            })
            .times(1)
            .returning(|_| Ok(Some(pom_xml("org.example", "lib", "1.0.0-SNAPSHOT"))));

        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport));
        let repositories =
            [Repository::new(INTERNAL).with_snapshots(ArtifactPolicy::ENABLED)];
        let request = DownloadRequest::new(
            Coordinate::new("org.example", "lib", "1.0.0-SNAPSHOT"),
            &repositories,
        );
        let pom = downloader.download(request).await.unwrap();

        assert_eq!(
            pom.dated_snapshot_version.as_deref(),
            Some("1.0.0-20200101.120000-3")
        );
    }

    #[tokio::test]
    async fn snapshot_without_metadata_is_not_found() {
        let mut transport = MockTransport::new();
        transport.expect_head().returning(|_| Ok(true));
        transport
            .expect_get()
            .withf(|url| url.ends_with("maven-metadata.xml"))
            .times(1)
            .returning(|_| Ok(None));

        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport));
        let repositories = [Repository::new(INTERNAL)];
        let request = DownloadRequest::new(
            Coordinate::new("org.example", "lib", "1.0.0-SNAPSHOT"),
            &repositories,
        );

        assert_eq!(downloader.download(request).await, None);
    }

    #[tokio::test]
    async fn release_version_skips_snapshot_only_repository() {
        let mut transport = MockTransport::new();
        transport.expect_head().returning(|_| Ok(true));
        transport
            .expect_get()
            .withf(|url| url.starts_with("https://snapshots.example.com"))
            .times(0)
            .returning(|_| Ok(Some(pom_xml("org.example", "lib", "1.0"))));
        transport
            .expect_get()
            .withf(|url| url.starts_with("https://releases.example.com"))
            .times(1)
            .returning(|_| Ok(None));

        let downloader = MavenDownloader::new(Arc::new(NoopCache), Arc::new(transport))
            .with_super_repository(
                Repository::new("https://releases.example.com")
                    .with_snapshots(ArtifactPolicy::DISABLED),
            );
        let repositories = [Repository::new("https://snapshots.example.com")
            .with_releases(ArtifactPolicy::DISABLED)];

        let request =
            DownloadRequest::new(Coordinate::new("org.example", "lib", "1.0"), &repositories);
        assert_eq!(downloader.download(request).await, None);
        assert_eq!(downloader.outcomes().total(AttemptKind::Pom), 1);
    }

    #[tokio::test]
    async fn downloaded_pom_is_served_from_cache() {
        let mut transport = MockTransport::new();
        transport.expect_head().returning(|_| Ok(true));
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(Some(pom_xml("org.example", "lib", "1.0"))));

        let cache = Arc::new(SqliteCache::open_in_memory(86_400_000).unwrap());
        let downloader = MavenDownloader::new(cache, Arc::new(transport));
        let coordinate = Coordinate::new("org.example", "lib", "1.0");

        let first = downloader
            .download(DownloadRequest::new(coordinate.clone(), &[]))
            .await;
        let second = downloader
            .download(DownloadRequest::new(coordinate, &[]))
            .await;

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(downloader.outcomes().count(AttemptKind::Pom, AttemptOutcome::Cached), 1);
    }
}
