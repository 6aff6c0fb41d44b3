//! Maven POM resolution and dependency-management rewriting
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Downloader  │────▶│   Resolver   │────▶│  Normalizer  │
//! │  (pom.xml)   │     │  (metadata)  │     │ (repository) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!        │                    │                    │
//!        ▼                    ▼                    ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                 MavenCache (injected)                 │
//! └──────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                    ┌──────────────┐
//!                    │  Transport   │
//!                    └──────────────┘
//!
//! ┌──────────────┐     ┌──────────────┐
//! │   Manage     │────▶│   Version    │
//! │ Dependencies │     │  (ordering)  │
//! └──────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: three-outcome cache abstraction with no-op and SQLite backends
//! - [`config`]: resolver configuration and data paths
//! - [`error`]: error types for cache and fetch operations
//! - [`logging`]: tracing subscriber setup
//! - [`pom`]: POM model, XML tag tree, text edits and the dependency-management rewriter
//! - [`repository`]: repositories, transport, metadata resolution and POM download
//! - [`version`]: Maven version ordering and version ranges

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod pom;
pub mod repository;
pub mod version;
