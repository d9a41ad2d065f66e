//! Persisted content cache with age and size eviction.
//!
//! Each record is one bincode file under the cache root, named by the
//! digest of its key. The in-memory index is rebuilt by scanning the root
//! at open time, so the cache survives restarts. Eviction runs in two
//! passes: records older than the age ceiling go first, then the oldest
//! remaining records until total size fits under the byte ceiling.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use capstream_codec::hash_bytes;

use crate::error::{CacheError, Result};

/// One cached compressed capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Stable identifier the record is looked up by.
    pub file_id: String,
    /// Original capture filename, kept for export naming.
    pub filename: String,
    /// Compressed payload.
    pub data: Vec<u8>,
    /// Size of the capture before compression.
    pub original_size: u64,
    /// Size of `data`.
    pub compressed_size: u64,
    /// When the record was cached, in milliseconds since the Unix epoch.
    pub cached_at_ms: u64,
}

/// Configuration for the persisted cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the record files.
    pub root: PathBuf,
    /// Total on-disk byte ceiling (default 512 MiB).
    pub max_total_bytes: u64,
    /// Records older than this are pruned (default 7 days).
    pub max_age: Duration,
}

impl CacheConfig {
    /// Configuration with default ceilings under the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_total_bytes: 512 * 1024 * 1024,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Statistics for cache effectiveness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of lookups that found a record.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of records stored.
    pub insertions: u64,
    /// Number of records removed by pruning.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a ratio of hits to total lookups, 0.0 when unused.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    path: PathBuf,
    bytes: u64,
    cached_at_ms: u64,
}

/// Disk-backed cache of compressed captures, keyed by file id.
pub struct ContentCache {
    config: CacheConfig,
    index: HashMap<String, IndexEntry>,
    total_bytes: u64,
    stats: CacheStats,
}

impl ContentCache {
    /// Open the cache, creating the root directory if needed and scanning
    /// it to rebuild the index. Unreadable record files are deleted.
    pub fn open(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.root)
            .map_err(|e| CacheError::RootUnavailable(config.root.clone(), e))?;

        let mut index = HashMap::new();
        let mut total_bytes = 0u64;

        for entry in fs::read_dir(&config.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) => {
                    let bytes = entry.metadata()?.len();
                    total_bytes += bytes;
                    index.insert(
                        record.file_id,
                        IndexEntry {
                            path,
                            bytes,
                            cached_at_ms: record.cached_at_ms,
                        },
                    );
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "dropping unreadable cache record");
                    let _ = fs::remove_file(&path);
                }
            }
        }

        debug!(
            root = %config.root.display(),
            records = index.len(),
            total_bytes,
            "opened content cache"
        );

        Ok(Self {
            config,
            index,
            total_bytes,
            stats: CacheStats::default(),
        })
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.config
            .root
            .join(format!("{}.bin", hash_bytes(key.as_bytes()).to_hex()))
    }

    fn read_record(path: &Path) -> Result<CacheRecord> {
        let bytes = fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Look up a record by file id.
    pub fn get(&mut self, key: &str) -> Option<CacheRecord> {
        let Some(entry) = self.index.get(key) else {
            self.stats.misses += 1;
            return None;
        };
        match Self::read_record(&entry.path) {
            Ok(record) => {
                self.stats.hits += 1;
                Some(record)
            }
            Err(e) => {
                warn!(key, error = %e, "cached record unreadable, dropping it");
                self.drop_entry(key);
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a record, pruning first so ceilings hold with the new record
    /// counted. Replaces any existing record for the same file id.
    pub fn insert(&mut self, record: CacheRecord) -> Result<()> {
        let encoded = bincode::serialize(&record)?;
        self.prune_for(encoded.len() as u64);

        let path = self.record_path(&record.file_id);
        let tmp = self.config.root.join(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, &encoded)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp);
                CacheError::Persist {
                    key: record.file_id.clone(),
                    source: e,
                }
            })?;

        if let Some(old) = self.index.remove(&record.file_id) {
            self.total_bytes -= old.bytes;
        }
        self.total_bytes += encoded.len() as u64;
        self.index.insert(
            record.file_id.clone(),
            IndexEntry {
                path,
                bytes: encoded.len() as u64,
                cached_at_ms: record.cached_at_ms,
            },
        );
        self.stats.insertions += 1;
        debug!(
            key = %record.file_id,
            bytes = encoded.len(),
            total_bytes = self.total_bytes,
            "cached record stored"
        );
        Ok(())
    }

    /// Remove one record. Returns `true` if it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.drop_entry(key)
    }

    /// Remove every record and reset the byte total. Stats are kept.
    pub fn clear(&mut self) {
        for entry in self.index.values() {
            let _ = fs::remove_file(&entry.path);
        }
        self.index.clear();
        self.total_bytes = 0;
        debug!("cleared content cache");
    }

    /// Enforce both ceilings: first delete records older than `max_age`,
    /// then delete oldest records until the total fits `max_total_bytes`.
    pub fn prune(&mut self) {
        self.prune_for(0);
    }

    fn prune_for(&mut self, incoming_bytes: u64) {
        let now = Self::now_ms();
        let max_age_ms = self.config.max_age.as_millis() as u64;
        let expired: Vec<String> = self
            .index
            .iter()
            .filter(|(_, e)| now.saturating_sub(e.cached_at_ms) > max_age_ms)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            debug!(key = %key, "pruning expired cache record");
            if self.drop_entry(&key) {
                self.stats.evictions += 1;
            }
        }

        let budget = self.config.max_total_bytes.saturating_sub(incoming_bytes);
        if self.total_bytes <= budget {
            return;
        }
        let mut by_age: Vec<(String, u64)> = self
            .index
            .iter()
            .map(|(k, e)| (k.clone(), e.cached_at_ms))
            .collect();
        by_age.sort_by_key(|(_, cached_at)| *cached_at);
        for (key, _) in by_age {
            if self.total_bytes <= budget {
                break;
            }
            debug!(key = %key, total_bytes = self.total_bytes, "pruning cache record for space");
            if self.drop_entry(&key) {
                self.stats.evictions += 1;
            }
        }
    }

    fn drop_entry(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(entry) => {
                self.total_bytes -= entry.bytes;
                let _ = fs::remove_file(&entry.path);
                true
            }
            None => false,
        }
    }

    /// True if a record exists for the key. Does not touch hit/miss stats.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no records are cached.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Current on-disk byte total across all records.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Effectiveness counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, payload_len: usize, cached_at_ms: u64) -> CacheRecord {
        CacheRecord {
            file_id: id.to_string(),
            filename: format!("{id}.cap"),
            data: vec![0x42; payload_len],
            original_size: (payload_len * 4) as u64,
            compressed_size: payload_len as u64,
            cached_at_ms,
        }
    }

    fn small_cache(root: &Path, max_total_bytes: u64) -> ContentCache {
        let mut config = CacheConfig::new(root);
        config.max_total_bytes = max_total_bytes;
        ContentCache::open(config).unwrap()
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = small_cache(dir.path(), 1 << 20);

        let r = record("file-1", 1000, ContentCache::now_ms());
        cache.insert(r.clone()).unwrap();

        assert_eq!(cache.get("file-1"), Some(r));
        assert_eq!(cache.get("file-2"), None);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let r = record("persist-me", 500, ContentCache::now_ms());
        {
            let mut cache = small_cache(dir.path(), 1 << 20);
            cache.insert(r.clone()).unwrap();
        }
        let mut cache = small_cache(dir.path(), 1 << 20);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("persist-me"), Some(r));
    }

    #[test]
    fn insert_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = small_cache(dir.path(), 1 << 20);

        cache.insert(record("dup", 100, 1000)).unwrap();
        let newer = record("dup", 200, 2000);
        cache.insert(newer.clone()).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("dup"), Some(newer));
    }

    #[test]
    fn age_pruning_removes_expired_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CacheConfig::new(dir.path());
        config.max_age = Duration::from_secs(60);
        let mut cache = ContentCache::open(config).unwrap();

        let now = ContentCache::now_ms();
        cache.insert(record("old", 100, now - 120_000)).unwrap();
        cache.insert(record("fresh", 100, now)).unwrap();

        cache.prune();
        assert!(!cache.contains("old"));
        assert!(cache.contains("fresh"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn size_pruning_evicts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        // Ceiling fits roughly two records of this size.
        let one = bincode::serialize(&record("x", 1000, 0)).unwrap().len() as u64;
        let mut cache = small_cache(dir.path(), one * 2 + one / 2);

        let now = ContentCache::now_ms();
        cache.insert(record("oldest", 1000, now - 3000)).unwrap();
        cache.insert(record("middle", 1000, now - 2000)).unwrap();
        cache.insert(record("newest", 1000, now - 1000)).unwrap();

        assert!(!cache.contains("oldest"));
        assert!(cache.contains("middle"));
        assert!(cache.contains("newest"));
        assert!(cache.total_bytes() <= one * 2 + one / 2);
    }

    #[test]
    fn remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = small_cache(dir.path(), 1 << 20);

        cache.insert(record("a", 100, 1)).unwrap();
        cache.insert(record("b", 100, 2)).unwrap();

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
        // Files are gone too.
        let remaining = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn corrupt_file_is_dropped_at_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cache = small_cache(dir.path(), 1 << 20);
            cache.insert(record("good", 100, 1)).unwrap();
        }
        std::fs::write(dir.path().join("deadbeef.bin"), b"not bincode").unwrap();

        let cache = small_cache(dir.path(), 1 << 20);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("good"));
        assert!(!dir.path().join("deadbeef.bin").exists());
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = small_cache(dir.path(), 1 << 20);
        cache.insert(record("k", 10, 1)).unwrap();

        let _ = cache.get("k");
        let _ = cache.get("k");
        let _ = cache.get("k");
        let _ = cache.get("absent");

        assert!((cache.stats().hit_rate() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_cache_hit_rate_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cache = small_cache(dir.path(), 1 << 20);
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
