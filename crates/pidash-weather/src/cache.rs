//! Key -> (timestamp, payload) cache stores.
//!
//! Stores never evict; staleness is decided by the caller against a TTL.
//! A store that cannot produce a usable entry reports a miss.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::WeatherError;
use crate::types::CacheEntry;

/// Persistence for raw upstream payloads.
///
/// Implementations must be safe for concurrent readers and writers. Each
/// write replaces the entry as a whole; last writer wins.
pub trait CacheStore: Send + Sync {
    /// Entry for `key`, or `None` if missing or unusable.
    fn read(&self, key: &str) -> Option<CacheEntry>;

    /// Persist `payload` under `key`, stamped with the current time.
    fn write(&self, key: &str, payload: &Value) -> Result<(), WeatherError>;
}

/// Current unix time in seconds
pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Whether an entry fetched at `fetched_at` is still usable at `now`.
///
/// Entries stamped in the future (clock skew) count as fresh.
pub fn is_fresh(fetched_at: i64, now: i64, ttl: Duration) -> bool {
    let age = now.saturating_sub(fetched_at);
    if age < 0 {
        return true;
    }
    (age as u64) < ttl.as_secs()
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_stem))
    }

    fn try_read(&self, key: &str) -> Result<Option<CacheEntry>, WeatherError> {
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WeatherError::CacheUnreadable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| {
            WeatherError::CacheUnreadable(format!("{}: {}", path.display(), e))
        })?;

        // Two keys can sanitize to the same file name
        if entry.key != key {
            return Err(WeatherError::CacheUnreadable(format!(
                "{} holds key '{}', expected '{}'",
                path.display(),
                entry.key,
                key
            )));
        }

        Ok(Some(entry))
    }
}

impl CacheStore for DiskCache {
    fn read(&self, key: &str) -> Option<CacheEntry> {
        match self.try_read(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Treating cache entry as missing: {}", e);
                None
            }
        }
    }

    fn write(&self, key: &str, payload: &Value) -> Result<(), WeatherError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            WeatherError::CacheWrite(format!(
                "Failed to create cache directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        #[derive(serde::Serialize)]
        struct EntryRef<'a> {
            key: &'a str,
            fetched_at: i64,
            payload: &'a Value,
        }

        let body = serde_json::to_vec(&EntryRef {
            key,
            fetched_at: now_unix(),
            payload,
        })
        .map_err(|e| WeatherError::CacheWrite(e.to_string()))?;

        // Unique temp file in the same directory, then an atomic rename
        let path = self.entry_path(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| WeatherError::CacheWrite(e.to_string()))?;
        tmp.write_all(&body)
            .and_then(|_| tmp.flush())
            .map_err(|e| WeatherError::CacheWrite(e.to_string()))?;
        tmp.persist(&path).map_err(|e| {
            WeatherError::CacheWrite(format!("{}: {}", path.display(), e.error))
        })?;

        tracing::debug!("Cached {} ({} bytes)", key, body.len());
        Ok(())
    }
}

/// In-process store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an entry with an explicit timestamp.
    pub fn insert(&self, entry: CacheEntry) {
        self.entries.write().insert(entry.key.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    fn write(&self, key: &str, payload: &Value) -> Result<(), WeatherError> {
        self.insert(CacheEntry {
            key: key.to_string(),
            fetched_at: now_unix(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
