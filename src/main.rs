use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use pom_resolver::cache::{MavenCache, NoopCache, SqliteCache};
use pom_resolver::config::{self, ResolverConfig};
use pom_resolver::logging::{self, LogOptions};
use pom_resolver::pom::ManageDependencies;
use pom_resolver::repository::{
    Coordinate, DownloadRequest, HttpTransport, MavenDownloader, Repository,
};

#[derive(Parser)]
#[command(name = "pom-resolver")]
#[command(version, about = "Maven POM resolution and dependency management")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to the data directory instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print versions merged from every repository
    Metadata {
        /// groupId:artifactId
        artifact: String,
        /// Additional repository URL, may be repeated
        #[arg(long = "repo")]
        repositories: Vec<String>,
    },
    /// Download a POM and print its dependencies
    Download {
        /// groupId:artifactId:version[:classifier]
        coordinate: Coordinate,
        #[arg(long = "repo")]
        repositories: Vec<String>,
    },
    /// Move matching dependency versions into <dependencyManagement>
    Manage {
        pom: PathBuf,
        /// groupId glob, `*` matches any sequence
        #[arg(long)]
        group: String,
        /// artifactId glob
        #[arg(long)]
        artifact: Option<String>,
        /// Version to standardize on; defaults to the highest declared
        #[arg(long)]
        version: Option<String>,
        /// Rewrite the file in place instead of printing
        #[arg(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(&LogOptions {
        file: cli.log_file.then(config::log_path),
        json: cli.log_json,
    })?;

    let config = match &cli.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, config: ResolverConfig) -> anyhow::Result<()> {
    match command {
        Command::Metadata {
            artifact,
            repositories,
        } => {
            let (group_id, artifact_id) = artifact
                .split_once(':')
                .context("expected groupId:artifactId")?;
            let downloader = downloader(&config)?;
            let repositories = repositories_with(&config, repositories);

            let metadata = downloader
                .download_metadata(group_id, artifact_id, &repositories)
                .await;
            for version in metadata.versions() {
                println!("{}", version);
            }
            if let Some(latest) = &metadata.versioning.latest {
                println!("latest: {}", latest);
            }
        }
        Command::Download {
            coordinate,
            repositories,
        } => {
            let downloader = downloader(&config)?;
            let repositories = repositories_with(&config, repositories);

            let pom = downloader
                .download(DownloadRequest::new(coordinate.clone(), &repositories))
                .await
                .with_context(|| format!("{} not found", coordinate))?;
            for dependency in pom.active_dependencies() {
                println!(
                    "{}:{}:{}",
                    dependency.group_id,
                    dependency.artifact_id,
                    dependency.version.as_deref().unwrap_or("?")
                );
            }
        }
        Command::Manage {
            pom,
            group,
            artifact,
            version,
            write,
        } => {
            let mut rewriter = ManageDependencies::new(&group)?;
            if let Some(artifact) = &artifact {
                rewriter = rewriter.with_artifact_pattern(artifact)?;
            }
            if let Some(version) = version {
                rewriter = rewriter.with_version(version);
            }

            let source = std::fs::read_to_string(&pom)
                .with_context(|| format!("failed to read {}", pom.display()))?;
            let rewritten = rewriter.apply(&source)?;
            if write {
                std::fs::write(&pom, rewritten)?;
                info!("Rewrote {}", pom.display());
            } else {
                print!("{}", rewritten);
            }
        }
    }
    Ok(())
}

fn downloader(config: &ResolverConfig) -> anyhow::Result<MavenDownloader> {
    let cache: Arc<dyn MavenCache> = if config.cache.enabled {
        let db_path = config::db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Using cache at {}", db_path.display());
        Arc::new(SqliteCache::new(&db_path, config.cache.refresh_interval)?)
    } else {
        Arc::new(NoopCache)
    };
    let transport = Arc::new(HttpTransport::new(Duration::from_millis(
        config.fetch_timeout_ms,
    ))?);

    Ok(MavenDownloader::new(cache, transport)
        .with_super_repository(config.super_repository())
        .with_insecure_upgrade(config.upgrade_insecure_repositories))
}

fn repositories_with(config: &ResolverConfig, extra: Vec<String>) -> Vec<Repository> {
    config
        .repositories
        .iter()
        .cloned()
        .chain(extra.into_iter().map(Repository::new))
        .collect()
}
