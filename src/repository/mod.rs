//! Repository layer
//! - types.rs: `Repository`, `ArtifactPolicy`, `Coordinate` and URL layout
//! - transport.rs: `Transport` trait and the reqwest-backed `HttpTransport`
//! - metadata.rs: `maven-metadata.xml` model and merge
//! - normalizer.rs: secure-scheme upgrade and reachability probing
//! - resolver.rs: metadata fan-out across repositories, version resolution
//! - downloader.rs: local-first, first-success POM download
//! - outcome.rs: per-attempt outcome counters

pub mod downloader;
pub mod metadata;
pub mod normalizer;
pub mod outcome;
pub mod resolver;
pub mod transport;
pub mod types;

pub use downloader::{DownloadRequest, MavenDownloader};
pub use metadata::VersionMetadata;
pub use normalizer::RepositoryNormalizer;
pub use outcome::{AttemptKind, AttemptOutcome, DownloadOutcomes};
pub use resolver::MetadataResolver;
pub use transport::{HttpTransport, Transport};
pub use types::{ArtifactPolicy, Coordinate, Repository, SUPER_REPOSITORY_URL};
