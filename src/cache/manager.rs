// Get-or-fetch coordination over the persistent store.
// Callers name a (kind, owner) pair and never see storage keys.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::Result;

use super::keys::{CacheKind, Owner, TtlPolicy, cache_key};
use super::store::{PersistentStore, WriteOutcome};

/// Per-call cache options.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Overrides the kind/owner default TTL.
    pub ttl: Option<Duration>,
    /// Skip the cache read and always fetch.
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn refresh(force_refresh: bool) -> Self {
        Self {
            ttl: None,
            force_refresh,
        }
    }
}

/// Cache coordinator. Concurrent misses on the same key each fetch.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<PersistentStore>,
    ttls: Arc<TtlPolicy>,
}

impl CacheManager {
    pub fn new(store: Arc<PersistentStore>, ttls: TtlPolicy) -> Self {
        Self {
            store,
            ttls: Arc::new(ttls),
        }
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Return the cached value for `(kind, owner)`, or run `fetch`, cache its
    /// result, and return it. `fetch` is not called on a valid hit.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        kind: CacheKind,
        owner: &Owner,
        fetch: F,
        options: FetchOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = cache_key(kind, owner);

        if !options.force_refresh {
            if let Some(cached) = self.store.get::<T>(&key) {
                debug!("Cache hit for {kind} of {owner}");
                return Ok(cached);
            }
            debug!("Cache miss for {kind} of {owner}");
        } else {
            debug!("Refreshing {kind} of {owner}");
        }

        let value = fetch().await?;

        let ttl = options
            .ttl
            .unwrap_or_else(|| self.ttls.ttl_for(kind, owner));
        self.write(kind, owner, &value, ttl);

        Ok(value)
    }

    /// Cache a value obtained elsewhere under the default TTL for `(kind, owner)`.
    pub fn put<T: Serialize>(&self, kind: CacheKind, owner: &Owner, value: &T) -> WriteOutcome {
        self.write(kind, owner, value, self.ttls.ttl_for(kind, owner))
    }

    fn write<T: Serialize>(
        &self,
        kind: CacheKind,
        owner: &Owner,
        value: &T,
        ttl: Duration,
    ) -> WriteOutcome {
        let outcome = self.store.set(&cache_key(kind, owner), value, ttl);
        if let WriteOutcome::Skipped { reason } = &outcome {
            warn!("Continuing without cache for {kind} of {owner}: {reason}");
        }
        outcome
    }

    /// Read without fetching.
    pub fn peek<T: DeserializeOwned>(&self, kind: CacheKind, owner: &Owner) -> Option<T> {
        self.store.get(&cache_key(kind, owner))
    }

    /// Drop one (kind, owner) entry.
    pub fn invalidate(&self, kind: CacheKind, owner: &Owner) {
        self.store.remove(&cache_key(kind, owner));
    }

    /// Drop every kind cached for `owner`.
    pub fn invalidate_all(&self, owner: &Owner) {
        for kind in CacheKind::ALL {
            self.invalidate(kind, owner);
        }
    }

    /// Drop everything in the namespace.
    pub fn clear(&self) -> usize {
        self.store.clear()
    }

    /// Opportunistic sweep of expired entries.
    pub fn sweep(&self) -> usize {
        self.store.clear_old_entries()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::cache::backend::MemoryBackend;
    use crate::clock::ManualClock;
    use crate::error::GhdashError;

    fn manager() -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = PersistentStore::new(Arc::new(MemoryBackend::new()), clock.clone(), "t_");
        let ttls = TtlPolicy::new(Duration::from_secs(60), Duration::from_secs(10));
        (CacheManager::new(Arc::new(store), ttls), clock)
    }

    async fn counted(calls: &AtomicUsize, value: u32) -> Result<u32> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_hit_does_not_fetch() {
        let (cache, _) = manager();
        let calls = AtomicUsize::new(0);
        let owner = Owner::Authenticated;

        let first = cache
            .get_or_fetch(
                CacheKind::Repos,
                &owner,
                || counted(&calls, 7),
                FetchOptions::default(),
            )
            .await
            .unwrap();
        let second = cache
            .get_or_fetch(
                CacheKind::Repos,
                &owner,
                || counted(&calls, 8),
                FetchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!((first, second), (7, 7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expiry_forces_refetch() {
        let (cache, clock) = manager();
        let calls = AtomicUsize::new(0);
        let owner = Owner::user("octocat");

        cache
            .get_or_fetch(
                CacheKind::Stars,
                &owner,
                || counted(&calls, 1),
                FetchOptions::default(),
            )
            .await
            .unwrap();

        // Other-user TTL is 10s in this policy
        clock.advance(chrono::Duration::milliseconds(10_001));

        let value = cache
            .get_or_fetch(
                CacheKind::Stars,
                &owner,
                || counted(&calls, 2),
                FetchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_valid_entry() {
        let (cache, _) = manager();
        let calls = AtomicUsize::new(0);
        let owner = Owner::Authenticated;

        cache
            .get_or_fetch(
                CacheKind::User,
                &owner,
                || counted(&calls, 1),
                FetchOptions::default(),
            )
            .await
            .unwrap();
        let value = cache
            .get_or_fetch(
                CacheKind::User,
                &owner,
                || counted(&calls, 2),
                FetchOptions::refresh(true),
            )
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek::<u32>(CacheKind::User, &owner), Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_then_read_fetches() {
        let (cache, _) = manager();
        let calls = AtomicUsize::new(0);
        let owner = Owner::Authenticated;

        cache
            .get_or_fetch(
                CacheKind::Followers,
                &owner,
                || counted(&calls, 1),
                FetchOptions::default(),
            )
            .await
            .unwrap();
        cache.invalidate(CacheKind::Followers, &owner);
        cache
            .get_or_fetch(
                CacheKind::Followers,
                &owner,
                || counted(&calls, 1),
                FetchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_is_scoped_to_owner() {
        let (cache, _) = manager();
        let calls = AtomicUsize::new(0);
        let me = Owner::Authenticated;
        let other = Owner::user("someone");

        for kind in [CacheKind::Repos, CacheKind::Stars] {
            for owner in [&me, &other] {
                cache
                    .get_or_fetch(
                        kind,
                        owner,
                        || counted(&calls, 1),
                        FetchOptions::default(),
                    )
                    .await
                    .unwrap();
            }
        }

        cache.invalidate_all(&me);

        assert_eq!(cache.peek::<u32>(CacheKind::Repos, &me), None);
        assert_eq!(cache.peek::<u32>(CacheKind::Stars, &me), None);
        assert_eq!(cache.peek::<u32>(CacheKind::Repos, &other), Some(1));
        assert_eq!(cache.peek::<u32>(CacheKind::Stars, &other), Some(1));
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let (cache, _) = manager();
        let owner = Owner::Authenticated;

        let result = cache
            .get_or_fetch(
                CacheKind::User,
                &owner,
                || async { Err::<u32, _>(GhdashError::Unauthorized) },
                FetchOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(GhdashError::Unauthorized)));
        assert_eq!(cache.peek::<u32>(CacheKind::User, &owner), None);
    }

    #[tokio::test]
    async fn test_explicit_ttl_overrides_policy() {
        let (cache, clock) = manager();
        let calls = AtomicUsize::new(0);
        let owner = Owner::Authenticated;
        let options = FetchOptions {
            ttl: Some(Duration::from_secs(1)),
            force_refresh: false,
        };

        cache
            .get_or_fetch(CacheKind::Repos, &owner, || counted(&calls, 1), options)
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(2));
        cache
            .get_or_fetch(CacheKind::Repos, &owner, || counted(&calls, 1), options)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_put_seeds_entry_with_policy_ttl() {
        let (cache, clock) = manager();
        let calls = AtomicUsize::new(0);
        let owner = Owner::user("octocat");

        assert_eq!(cache.put(CacheKind::Repos, &owner, &7u32), WriteOutcome::Stored);
        let value = cache
            .get_or_fetch(
                CacheKind::Repos,
                &owner,
                || counted(&calls, 1),
                FetchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        clock.advance(chrono::Duration::seconds(11));
        assert_eq!(cache.peek::<u32>(CacheKind::Repos, &owner), None);
    }
}
