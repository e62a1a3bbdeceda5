// Persistent key-value store for cached API data.
// Handles JSON entries with TTL metadata and recovers from quota exhaustion.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::clock::Clock;

use super::backend::{StorageBackend, StorageError};

/// Wrapper for cached data with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached data.
    pub data: T,
    /// When the data was cached, in epoch milliseconds.
    pub timestamp: i64,
    /// How long the data stays valid, in milliseconds.
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp,
            ttl: ttl.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }

    /// Valid iff `now - timestamp <= ttl`.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        is_expired(self.timestamp, self.ttl, now_millis)
    }
}

fn is_expired(timestamp: i64, ttl: u64, now_millis: i64) -> bool {
    let age = i128::from(now_millis) - i128::from(timestamp);
    age > i128::from(ttl)
}

/// Metadata read during scans; the payload is skipped.
#[derive(Debug, Deserialize)]
struct EntryHeader {
    timestamp: i64,
    ttl: u64,
}

/// Result of a cache write. Writes never fail the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    /// Stored after quota recovery removed `evicted` entries.
    StoredAfterEviction { evicted: usize },
    /// Nothing was cached; the app continues without it.
    Skipped { reason: String },
}

impl WriteOutcome {
    pub fn is_stored(&self) -> bool {
        !matches!(self, WriteOutcome::Skipped { .. })
    }
}

/// Namespaced, TTL-aware store over a [`StorageBackend`].
pub struct PersistentStore {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    namespace: String,
    max_attempts: u32,
}

impl PersistentStore {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            clock,
            namespace: namespace.into(),
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// On quota exhaustion the first retry is preceded by removing expired
    /// entries and the second by removing the oldest half of all entries.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> WriteOutcome {
        let entry = CacheEntry::new(value, self.clock.now_millis(), ttl);
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!("Skipping cache write for '{key}': {e}");
                return WriteOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let full_key = self.full_key(key);
        let mut evicted = 0;

        for attempt in 1..=self.max_attempts {
            match self.backend.set_item(&full_key, &json) {
                Ok(()) if evicted == 0 => return WriteOutcome::Stored,
                Ok(()) => {
                    debug!("Cached '{key}' after evicting {evicted} entries");
                    return WriteOutcome::StoredAfterEviction { evicted };
                }
                Err(StorageError::QuotaExceeded) if attempt < self.max_attempts => {
                    let removed = if attempt == 1 {
                        self.evict_expired()
                    } else {
                        self.evict_oldest_half()
                    };
                    warn!(
                        "Storage quota exceeded writing '{key}' (attempt {attempt}), \
                         evicted {removed} entries"
                    );
                    evicted += removed;
                }
                Err(StorageError::QuotaExceeded) => break,
                Err(e) => {
                    warn!("Skipping cache write for '{key}': {e}");
                    return WriteOutcome::Skipped {
                        reason: e.to_string(),
                    };
                }
            }
        }

        warn!(
            "Giving up on caching '{key}' after {} attempts",
            self.max_attempts
        );
        WriteOutcome::Skipped {
            reason: StorageError::QuotaExceeded.to_string(),
        }
    }

    /// Read a value if present and unexpired. Expired or unreadable entries
    /// are deleted and reported as missing.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.full_key(key);
        let raw = match self.backend.get_item(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for '{key}': {e}");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Dropping malformed cache entry '{key}': {e}");
                self.remove_full(&full_key);
                return None;
            }
        };

        if entry.is_expired(self.clock.now_millis()) {
            debug!("Cache entry '{key}' expired");
            self.remove_full(&full_key);
            return None;
        }

        Some(entry.data)
    }

    /// Delete one entry.
    pub fn remove(&self, key: &str) {
        self.remove_full(&self.full_key(key));
    }

    /// Delete every namespaced entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let keys = self.namespaced_keys();
        for key in &keys {
            self.remove_full(key);
        }
        keys.len()
    }

    /// Remove only logically expired entries.
    pub fn clear_old_entries(&self) -> usize {
        self.evict_expired()
    }

    fn remove_full(&self, full_key: &str) {
        if let Err(e) = self.backend.remove_item(full_key) {
            warn!("Failed to remove cache entry '{full_key}': {e}");
        }
    }

    fn namespaced_keys(&self) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.namespace))
                .collect(),
            Err(e) => {
                warn!("Failed to list cache keys: {e}");
                Vec::new()
            }
        }
    }

    /// Headers of all readable namespaced entries. Malformed ones are deleted.
    fn scan(&self) -> Vec<(String, EntryHeader)> {
        let mut entries = Vec::new();

        for key in self.namespaced_keys() {
            let raw = match self.backend.get_item(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cache read failed for '{key}' during scan: {e}");
                    continue;
                }
            };

            match serde_json::from_str::<EntryHeader>(&raw) {
                Ok(header) => entries.push((key, header)),
                Err(_) => {
                    warn!("Dropping malformed cache entry '{key}'");
                    self.remove_full(&key);
                }
            }
        }

        entries
    }

    fn evict_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        for (key, header) in self.scan() {
            if is_expired(header.timestamp, header.ttl, now) {
                self.remove_full(&key);
                removed += 1;
            }
        }
        removed
    }

    fn evict_oldest_half(&self) -> usize {
        let mut entries = self.scan();
        if entries.is_empty() {
            return 0;
        }

        entries.sort_by_key(|(_, header)| header.timestamp);
        let count = (entries.len() / 2).max(1);
        for (key, _) in entries.iter().take(count) {
            self.remove_full(key);
        }
        count
    }
}
