//! Per-attempt download accounting

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::debug;

use crate::cache::CacheState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    Metadata,
    Pom,
}

impl AttemptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptKind::Metadata => "metadata",
            AttemptKind::Pom => "pom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    Cached,
    Downloaded,
    Unavailable,
    Error,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Cached => "cached",
            AttemptOutcome::Downloaded => "downloaded",
            AttemptOutcome::Unavailable => "unavailable",
            AttemptOutcome::Error => "error",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl From<CacheState> for AttemptOutcome {
    fn from(state: CacheState) -> Self {
        match state {
            CacheState::Cached => AttemptOutcome::Cached,
            CacheState::Updated => AttemptOutcome::Downloaded,
            CacheState::Unavailable => AttemptOutcome::Unavailable,
        }
    }
}

/// Counters keyed by attempt kind and outcome, shared by the resolver and downloader
#[derive(Debug, Default)]
pub struct DownloadOutcomes {
    counters: [[AtomicU64; 4]; 2],
}

impl DownloadOutcomes {
    pub fn record(
        &self,
        kind: AttemptKind,
        coordinate: &str,
        outcome: AttemptOutcome,
        started: Instant,
    ) {
        self.counters[kind as usize][outcome.index()].fetch_add(1, Ordering::Relaxed);
        debug!(
            kind = kind.as_str(),
            outcome = outcome.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} {}",
            kind.as_str(),
            coordinate
        );
    }

    pub fn count(&self, kind: AttemptKind, outcome: AttemptOutcome) -> u64 {
        self.counters[kind as usize][outcome.index()].load(Ordering::Relaxed)
    }

    pub fn total(&self, kind: AttemptKind) -> u64 {
        self.counters[kind as usize]
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }
}
