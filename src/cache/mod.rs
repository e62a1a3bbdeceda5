// Cache module for local persistent caching.
// Stores GitHub API responses with TTLs and quota-aware eviction.

pub mod backend;
pub mod keys;
pub mod manager;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageError};
pub use keys::{CacheKind, Owner, TtlPolicy, cache_key};
pub use manager::{CacheManager, FetchOptions};
pub use store::{CacheEntry, PersistentStore, WriteOutcome};
