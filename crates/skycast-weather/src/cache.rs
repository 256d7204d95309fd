//! Forecast cache capability and its backends.
//!
//! The resolver only sees [`ForecastCache`]; which store sits behind it is a
//! construction-time choice. Both backends are last-write-wins, and each write
//! sweeps out every entry whose TTL has passed.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::types::Forecast;

/// Key-value store for resolved forecasts, keyed by normalized query.
pub trait ForecastCache: Send + Sync {
    /// Fetch a fresh entry. Expired entries read as `None`.
    fn get(&self, key: &str) -> Result<Option<Forecast>>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    fn set(&self, key: &str, value: &Forecast, ttl: Duration) -> Result<()>;
}

struct MemoryEntry {
    forecast: Forecast,
    expires_at: Instant,
}

/// Process-local cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

impl ForecastCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Forecast>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if e.expires_at > now => return Ok(Some(e.forecast.clone())),
                Some(_) => {}
            }
        }

        // Re-check under the write lock; another writer may have refreshed it.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
            tracing::debug!("Evicted expired cache entry");
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &Forecast, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow!("TTL overflow"))?;

        let mut forecast = value.clone();
        forecast.from_cache = false;

        let mut entries = self.entries.write();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                forecast,
                expires_at,
            },
        );
        Ok(())
    }
}

/// SQLite-backed cache, shared between processes using the same file.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache at {}", path.display()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;

        let purged = cache.purge_expired()?;
        if purged > 0 {
            tracing::debug!("Purged {} expired cache rows on open", purged);
        }
        Ok(cache)
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS forecasts (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                expires_at_ms INTEGER NOT NULL,
                cached_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_forecasts_expires ON forecasts(expires_at_ms);
            "#,
        )?;
        Ok(())
    }

    /// Delete every expired row, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now().timestamp_millis();
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM forecasts WHERE expires_at_ms <= ?1", params![now])?;
        Ok(removed)
    }

    /// Number of stored rows, expired or not.
    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM forecasts", [], |row| row.get(0))?;
        Ok(usize::try_from(count)?)
    }

    /// Clear all cached data.
    pub fn clear(&self) -> Result<()> {
        self.conn.lock().execute_batch("DELETE FROM forecasts;")?;
        Ok(())
    }
}

impl ForecastCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<Forecast>> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value_json, expires_at_ms FROM forecasts WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((_, expires_at)) if expires_at <= now => {
                conn.execute("DELETE FROM forecasts WHERE key = ?1", params![key])?;
                tracing::debug!("Evicted expired cache row");
                Ok(None)
            }
            Some((json, _)) => {
                let forecast = serde_json::from_str(&json)
                    .context("Failed to decode cached forecast")?;
                Ok(Some(forecast))
            }
        }
    }

    fn set(&self, key: &str, value: &Forecast, ttl: Duration) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).map_err(|_| anyhow!("TTL overflow"))?;
        let expires_at = now
            .checked_add(ttl_ms)
            .ok_or_else(|| anyhow!("TTL overflow"))?;

        let mut stored = value.clone();
        stored.from_cache = false;
        let json = serde_json::to_string(&stored)?;

        let conn = self.conn.lock();
        conn.execute("DELETE FROM forecasts WHERE expires_at_ms <= ?1", params![now])?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO forecasts (key, value_json, expires_at_ms, cached_at_ms)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![key, json, expires_at, now],
        )?;
        Ok(())
    }
}
