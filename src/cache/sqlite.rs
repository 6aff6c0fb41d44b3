use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cache::{CacheResult, EntryKind, Fetch, MavenCache, metadata_key, pom_key};
use crate::error::CacheError;
use crate::pom::model::RawPom;
use crate::repository::metadata::VersionMetadata;
use crate::repository::types::Repository;

/// Persistent cache backed by SQLite.
///
/// Values are stored as JSON. Entries older than the refresh interval are
/// recomputed; entries recorded as unavailable stay that way until
/// [`SqliteCache::invalidate`] or [`SqliteCache::clear`].
pub struct SqliteCache {
    conn: Mutex<Connection>,
    refresh_interval: i64,
    in_flight: InFlight,
}

type InFlight = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

struct StoredEntry {
    value: Option<String>,
    unavailable: bool,
    updated_at: i64,
}

impl SqliteCache {
    pub fn new(db_path: &Path, refresh_interval: i64) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");
        Self::with_connection(conn, refresh_interval)
    }

    pub fn open_in_memory(refresh_interval: i64) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?, refresh_interval)
    }

    fn with_connection(conn: Connection, refresh_interval: i64) -> Result<Self, CacheError> {
        let cache = Self {
            conn: Mutex::new(conn),
            refresh_interval,
            in_flight: Mutex::new(HashMap::new()),
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                kind TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT,
                unavailable INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (kind, key)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_updated_at ON entries(updated_at)",
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }

    fn lookup(&self, kind: EntryKind, key: &str) -> Result<Option<StoredEntry>, CacheError> {
        let conn = self.lock_conn()?;
        let entry = conn
            .query_row(
                "SELECT value, unavailable, updated_at FROM entries WHERE kind = ?1 AND key = ?2",
                (kind.as_str(), key),
                |row| {
                    Ok(StoredEntry {
                        value: row.get(0)?,
                        unavailable: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    fn store(&self, kind: EntryKind, key: &str, value: Option<&str>) -> Result<(), CacheError> {
        let now = Self::current_timestamp_ms();
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO entries (kind, key, value, unavailable, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(kind, key) DO UPDATE SET
                value = excluded.value,
                unavailable = excluded.unavailable,
                updated_at = excluded.updated_at
            "#,
            (kind.as_str(), key, value, value.is_none(), now),
        )?;

        Ok(())
    }

    fn is_fresh(&self, updated_at: i64) -> bool {
        Self::current_timestamp_ms() - updated_at < self.refresh_interval
    }

    /// Forget one entry, including an unavailable marker. Returns whether it existed.
    pub fn invalidate(&self, kind: EntryKind, key: &str) -> Result<bool, CacheError> {
        let conn = self.lock_conn()?;
        let removed = conn.execute(
            "DELETE FROM entries WHERE kind = ?1 AND key = ?2",
            (kind.as_str(), key),
        )?;
        Ok(removed > 0)
    }

    pub fn invalidate_metadata(
        &self,
        repository_url: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<bool, CacheError> {
        self.invalidate(
            EntryKind::Metadata,
            &metadata_key(repository_url, group_id, artifact_id),
        )
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM entries", [])?;
        Ok(())
    }

    fn join_flight(&self, flight_key: String) -> Result<Flight<'_>, CacheError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| CacheError::LockPoisoned)?;
        let lock = in_flight
            .entry(flight_key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        Ok(Flight {
            in_flight: &self.in_flight,
            key: flight_key,
            lock,
        })
    }

    async fn compute<T>(
        &self,
        kind: EntryKind,
        key: &str,
        fetch: Fetch<'_, T>,
    ) -> Result<CacheResult<T>, CacheError>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        let flight = self.join_flight(format!("{}|{}", kind.as_str(), key))?;
        let _turn = flight.lock.lock().await;
        self.compute_locked(kind, key, fetch).await
    }

    async fn compute_locked<T>(
        &self,
        kind: EntryKind,
        key: &str,
        fetch: Fetch<'_, T>,
    ) -> Result<CacheResult<T>, CacheError>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        if let Some(entry) = self.lookup(kind, key)? {
            if entry.unavailable {
                debug!("Cache hit (unavailable) for {} {}", kind.as_str(), key);
                return Ok(CacheResult::unavailable());
            }
            if let Some(value) = entry.value
                && self.is_fresh(entry.updated_at)
            {
                debug!("Cache hit for {} {}", kind.as_str(), key);
                return Ok(CacheResult::cached(serde_json::from_str(&value)?));
            }
        }

        let computed = fetch.await?;
        let serialized = computed.as_ref().map(serde_json::to_string).transpose()?;
        self.store(kind, key, serialized.as_deref())?;

        Ok(CacheResult::computed(computed))
    }
}

/// Membership in the per-key single-flight map. The map entry is removed when the
/// last member leaves, including when its future is dropped mid-computation.
struct Flight<'a> {
    in_flight: &'a InFlight,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            // Only the map and this member hold it: nobody is waiting
            if Arc::strong_count(&self.lock) == 2 {
                in_flight.remove(&self.key);
            }
        }
    }
}

#[async_trait::async_trait]
impl MavenCache for SqliteCache {
    async fn compute_metadata(
        &self,
        repository_url: &str,
        group_id: &str,
        artifact_id: &str,
        fetch: Fetch<'_, VersionMetadata>,
    ) -> Result<CacheResult<VersionMetadata>, CacheError> {
        let key = metadata_key(repository_url, group_id, artifact_id);
        self.compute(EntryKind::Metadata, &key, fetch).await
    }

    async fn compute_pom(
        &self,
        repository_url: &str,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        fetch: Fetch<'_, RawPom>,
    ) -> Result<CacheResult<RawPom>, CacheError> {
        let key = pom_key(repository_url, group_id, artifact_id, version);
        self.compute(EntryKind::Pom, &key, fetch).await
    }

    async fn compute_repository(
        &self,
        repository: &Repository,
        fetch: Fetch<'_, Repository>,
    ) -> Result<CacheResult<Repository>, CacheError> {
        let key = serde_json::to_string(repository)?;
        self.compute(EntryKind::Repository, &key, fetch).await
    }
}
